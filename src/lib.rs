//! EyeSpy provisioning library
//! Pairs a phone with an unconfigured EyeSpy camera over BLE, hands it WiFi
//! credentials and waits for the camera to confirm it joined the network.

// Module declarations
pub mod backend;
pub mod config;
pub mod core;
pub mod logging;
pub mod utils;

pub use crate::core::provisioning::{
    CameraIdSource, ErrorKind, OutcomeKind, ProvisioningError, ProvisioningState, RegisterCamera,
};
pub use crate::core::{Provisioner, ProvisioningReport, ProvisioningSession, SessionHandle};
