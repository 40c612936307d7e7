use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::{LevelFilter, error, info};

use eyespy_provisioning_lib::backend::HttpCameraRegistry;
use eyespy_provisioning_lib::config::AppConfig;
use eyespy_provisioning_lib::core::bluetooth::constants::DEFAULT_SCAN_DURATION_SECS;
use eyespy_provisioning_lib::core::network::{FixedNetwork, NetworkProbe, SystemNetworkProbe};
use eyespy_provisioning_lib::core::{BluetoothManager, Provisioner, ProvisioningSession};
use eyespy_provisioning_lib::{RegisterCamera, logging};

#[derive(Parser)]
#[command(name = "eyespy-provisioning", about = "Put an EyeSpy camera on your WiFi network")]
struct Cli {
    /// Configuration file (defaults to the per-user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List nearby EyeSpy cameras
    Scan {
        /// Scan duration in seconds
        #[arg(long, default_value_t = DEFAULT_SCAN_DURATION_SECS)]
        duration: u64,
    },
    /// Provision a camera found by `scan`
    Provision {
        /// Device id printed by `scan`
        #[arg(long)]
        device: String,
        /// Camera id already issued by the backend
        #[arg(long, conflicts_with_all = ["name", "group"])]
        camera_id: Option<String>,
        /// Register the camera under this name
        #[arg(long, requires = "group")]
        name: Option<String>,
        /// Group to register the camera in
        #[arg(long, requires = "name")]
        group: Option<String>,
        /// Network name to send instead of the one this host is on
        #[arg(long)]
        ssid: Option<String>,
        #[arg(long)]
        wifi_user: Option<String>,
        #[arg(long)]
        wifi_pass: Option<String>,
        /// Skip asking the camera about the network first
        #[arg(long)]
        skip_check: bool,
        /// Scan duration in seconds used to find the device
        #[arg(long, default_value_t = DEFAULT_SCAN_DURATION_SECS)]
        scan_duration: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info });

    let config_path = match cli.config {
        Some(path) => path,
        None => AppConfig::default_path()?,
    };
    let mut config = AppConfig::load_config(&config_path)
        .await
        .with_context(|| format!("could not load {:?}", config_path))?;

    let mut manager = BluetoothManager::new().await?;

    match cli.command {
        Command::Scan { duration } => {
            let cameras = manager.scan(Duration::from_secs(duration)).await?;
            println!("{}", serde_json::to_string_pretty(&cameras)?);
        }
        Command::Provision {
            device,
            camera_id,
            name,
            group,
            ssid,
            wifi_user,
            wifi_pass,
            skip_check,
            scan_duration,
        } => {
            if let Some(user) = wifi_user {
                config.provisioning.wifi_username = user;
            }
            if let Some(pass) = wifi_pass {
                config.provisioning.wifi_password = pass;
            }
            if skip_check {
                config.provisioning.check_network = false;
            }

            let probe: Arc<dyn NetworkProbe> = match ssid {
                Some(ssid) => Arc::new(FixedNetwork(Some(ssid))),
                None => Arc::new(SystemNetworkProbe),
            };
            let provisioner = Provisioner::new(config.provisioning.clone(), probe);

            manager.scan(Duration::from_secs(scan_duration)).await?;
            let transport = manager.connect_device(&device).await?;

            let session = match (camera_id, name, group) {
                (Some(camera_id), _, _) => provisioner.session(transport, camera_id),
                (None, Some(name), Some(group)) => {
                    let registry = HttpCameraRegistry::new(config.backend.clone())?;
                    provisioner.session(transport, RegisterCamera::new(registry, name, group))
                }
                _ => bail!("either --camera-id or --name with --group is required"),
            };

            let succeeded = run_until_interrupted(&provisioner, session).await?;

            if let Err(e) = manager.disconnect(&device).await {
                error!("Failed to disconnect from {}: {}", device, e);
            }
            if !succeeded {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Runs the session, cancelling it on Ctrl-C, and prints the report.
async fn run_until_interrupted<T>(
    provisioner: &Provisioner,
    session: ProvisioningSession<T>,
) -> Result<bool>
where
    T: eyespy_provisioning_lib::core::PeripheralTransport + 'static,
{
    let handle = session.handle();
    let mut running = tokio::spawn(session.run());

    let report = tokio::select! {
        report = &mut running => report?,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, cancelling session {}", handle.id());
            provisioner.cancel_provisioning(&handle);
            running.await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report.is_success())
}
