//! Network context probe: the name of the WiFi network this host is on.

use anyhow::{Context, Result, bail};
use log::{debug, warn};
use tokio::process::Command;

/// Reports the SSID the host is currently associated with.
///
/// `None` means the name could not be determined at all (radio off, missing
/// location permission, unsupported platform). It is not the same as an
/// empty name.
#[async_trait::async_trait]
pub trait NetworkProbe: Send + Sync {
    async fn current_network_name(&self) -> Option<String>;
}

/// A network name known up front, e.g. given on the command line.
#[derive(Debug, Clone)]
pub struct FixedNetwork(pub Option<String>);

#[async_trait::async_trait]
impl NetworkProbe for FixedNetwork {
    async fn current_network_name(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Asks the operating system's WiFi tooling.
#[derive(Debug, Clone, Default)]
pub struct SystemNetworkProbe;

impl SystemNetworkProbe {
    async fn run(program: &str, args: &[&str]) -> Result<String> {
        let output = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to run {}", program))?;
        if !output.status.success() {
            bail!("{} exited with {}", program, output.status);
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    #[cfg(target_os = "linux")]
    async fn query() -> Result<Option<String>> {
        if let Ok(out) = Self::run("iwgetid", &["-r"]).await {
            let ssid = out.trim();
            if !ssid.is_empty() {
                return Ok(Some(ssid.to_string()));
            }
        }
        let out = Self::run("nmcli", &["-t", "-f", "active,ssid", "dev", "wifi"]).await?;
        Ok(parse_nmcli(&out))
    }

    #[cfg(target_os = "macos")]
    async fn query() -> Result<Option<String>> {
        let out = Self::run("networksetup", &["-getairportnetwork", "en0"]).await?;
        Ok(parse_airport(&out))
    }

    #[cfg(target_os = "windows")]
    async fn query() -> Result<Option<String>> {
        let out = Self::run("netsh", &["wlan", "show", "interfaces"]).await?;
        Ok(parse_netsh(&out))
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    async fn query() -> Result<Option<String>> {
        bail!("no network probe for this platform")
    }
}

#[async_trait::async_trait]
impl NetworkProbe for SystemNetworkProbe {
    async fn current_network_name(&self) -> Option<String> {
        match Self::query().await {
            Ok(Some(ssid)) => {
                debug!("Host is on network {:?}", ssid);
                Some(ssid)
            }
            Ok(None) => {
                warn!("Host is not associated with a WiFi network");
                None
            }
            Err(e) => {
                warn!("Could not determine the current WiFi network: {:#}", e);
                None
            }
        }
    }
}

/// `nmcli -t -f active,ssid dev wifi` prints `yes:<ssid>` for the active network.
/// Colons inside the SSID are escaped as `\:`.
#[allow(dead_code)]
fn parse_nmcli(out: &str) -> Option<String> {
    out.lines()
        .find_map(|line| line.strip_prefix("yes:"))
        .map(|ssid| ssid.replace("\\:", ":"))
        .filter(|ssid| !ssid.is_empty())
}

#[allow(dead_code)]
fn parse_airport(out: &str) -> Option<String> {
    out.trim()
        .strip_prefix("Current Wi-Fi Network: ")
        .map(str::to_string)
        .filter(|ssid| !ssid.is_empty())
}

#[allow(dead_code)]
fn parse_netsh(out: &str) -> Option<String> {
    out.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with("BSSID"))
        .find_map(|line| line.strip_prefix("SSID"))
        .and_then(|rest| rest.split_once(':'))
        .map(|(_, ssid)| ssid.trim().to_string())
        .filter(|ssid| !ssid.is_empty())
}
