//! Provisioning handshake
//! This module drives an unconfigured camera from a fresh BLE connection to
//! a confirmed WiFi join, and reports how that went.

mod camera_id;
mod error;
mod report;
mod session;
mod state;

use std::sync::Arc;

use tokio::sync::Mutex;

pub use camera_id::{CameraIdSource, RegisterCamera};
pub use error::{ErrorKind, ProvisioningError};
pub use report::{OutcomeKind, ProvisioningReport, ProvisioningSuccess, SessionOutcome};
pub use session::{ProvisioningSession, SessionHandle};
pub use state::ProvisioningState;

use crate::config::provisioning_config::ProvisioningConfig;
use crate::core::bluetooth::PeripheralTransport;
use crate::core::network::NetworkProbe;

/// Creates provisioning sessions that share one configuration and network probe.
#[derive(Clone)]
pub struct Provisioner {
    config: ProvisioningConfig,
    probe: Arc<dyn NetworkProbe>,
}

impl Provisioner {
    pub fn new(config: ProvisioningConfig, probe: Arc<dyn NetworkProbe>) -> Self {
        Self { config, probe }
    }

    pub fn config(&self) -> &ProvisioningConfig {
        &self.config
    }

    /// Prepares a session without starting it, so the caller can keep a
    /// [`SessionHandle`] to observe or cancel it.
    pub fn session<T: PeripheralTransport>(
        &self,
        peripheral: Arc<Mutex<T>>,
        camera_id: impl CameraIdSource + 'static,
    ) -> ProvisioningSession<T> {
        ProvisioningSession::new(
            peripheral,
            self.probe.clone(),
            Box::new(camera_id),
            self.config.clone(),
        )
    }

    /// Runs a fresh session to completion.
    pub async fn start_provisioning<T: PeripheralTransport>(
        &self,
        peripheral: Arc<Mutex<T>>,
        camera_id: impl CameraIdSource + 'static,
    ) -> ProvisioningReport {
        self.session(peripheral, camera_id).run().await
    }

    pub fn cancel_provisioning(&self, session: &SessionHandle) {
        session.cancel();
    }
}
