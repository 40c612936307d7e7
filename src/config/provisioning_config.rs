use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::bluetooth::constants::{
    BLUETOOTH_OPERATION_TIMEOUT_SECS, CONNECTION_CONFIRMATION_TIMEOUT_SECS,
    DEVICE_STATE_ACTIVATED, DEVICE_STATE_FAILED,
};
use crate::core::bluetooth::GattProfile;
use crate::core::codec::ConnectionStatus;

/// How the camera's reported state maps onto the session outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinProgress {
    Connected,
    Failed,
    Pending,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningConfig {
    /// GATT identifiers; must match the camera firmware bit for bit.
    pub profile: GattProfile,

    /// Upper bound for discovery, each read, each write and subscribing.
    pub step_timeout_secs: u64,

    /// Upper bound for the camera to report that it joined the network.
    pub confirmation_timeout_secs: u64,

    /// Sent as `User` with the credentials.
    pub wifi_username: String,

    /// Sent as `Pass` with the credentials.
    pub wifi_password: String,

    /// Ask the camera about the network before sending credentials.
    pub check_network: bool,

    /// `State` value meaning the camera is on the network.
    pub connected_state: u32,

    /// `State` values meaning the camera gave up.
    pub failure_states: Vec<u32>,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        ProvisioningConfig {
            profile: GattProfile::default(),
            step_timeout_secs: BLUETOOTH_OPERATION_TIMEOUT_SECS,
            confirmation_timeout_secs: CONNECTION_CONFIRMATION_TIMEOUT_SECS,
            wifi_username: String::new(),
            wifi_password: String::new(),
            check_network: true,
            connected_state: DEVICE_STATE_ACTIVATED,
            failure_states: vec![DEVICE_STATE_FAILED],
        }
    }
}

impl ProvisioningConfig {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn classify(&self, status: &ConnectionStatus) -> JoinProgress {
        if status.state == self.connected_state {
            JoinProgress::Connected
        } else if self.failure_states.contains(&status.state) {
            JoinProgress::Failed
        } else {
            JoinProgress::Pending
        }
    }
}
