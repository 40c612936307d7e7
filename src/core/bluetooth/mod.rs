//! Bluetooth functionality for EyeSpy provisioning
//! This module handles scanning for cameras, connecting to them, and the
//! characteristic-level transport a provisioning session runs over.

mod connection;
pub mod constants;
mod manager;
#[cfg(test)]
pub(crate) mod mock;
mod scanner;
mod transport;
mod types;

// Re-export types that should be publicly accessible
pub use connection::{BluestTransport, ConnectionManager};
pub use manager::BluetoothManager;
pub use scanner::BluetoothScanner;
pub use transport::{PeripheralTransport, Subscription, TransportError};
pub use types::{BluetoothDevice, ConnectionNotification, GattProfile};
