//! Core functionality for EyeSpy provisioning
//! This module contains the BLE transport, the payload codec, the network
//! probe and the provisioning state machine built on them.

pub mod bluetooth;
pub mod codec;
pub mod network;
pub mod provisioning;

// Re-export commonly used types
pub use bluetooth::{BluetoothManager, PeripheralTransport};
pub use network::{NetworkProbe, SystemNetworkProbe};
pub use provisioning::{Provisioner, ProvisioningReport, ProvisioningSession, SessionHandle};
