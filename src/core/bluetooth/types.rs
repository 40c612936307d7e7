//! Defines shared data structures for the Bluetooth module.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::bluetooth::constants::{
    UUID_CONNECTION_CHAR, UUID_EYESPY_SERVICE, UUID_SERIAL_CHAR, UUID_WIFI_CHAR,
    UUID_WIFI_CHECK_CHAR,
};

/// Represents a discovered EyeSpy camera
#[derive(Debug, Clone, Serialize)]
pub struct BluetoothDevice {
    /// The advertised name of the device
    pub name: String,
    /// The address of the device (MAC address on most platforms, may be N/A on macOS)
    pub address: String,
    /// Platform-specific unique identifier for the device (especially important on macOS)
    pub id: String,
    /// The signal strength (RSSI) of the device
    pub rssi: i16,
    /// Whether the device is connected
    pub is_connected: bool,
}

impl BluetoothDevice {
    /// Creates a new BluetoothDevice instance
    pub fn new(id: String, name: String, address: String, rssi: i16, is_connected: bool) -> Self {
        Self {
            id,
            name,
            address,
            rssi,
            is_connected,
        }
    }
}

/// One update delivered on a subscribed characteristic.
/// Carries either an error or a value, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionNotification {
    Value(Vec<u8>),
    Error(String),
}

/// GATT identifiers of the provisioning service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GattProfile {
    pub service: Uuid,
    pub serial: Uuid,
    pub wifi: Uuid,
    pub wifi_check: Uuid,
    pub connection: Uuid,
}

impl Default for GattProfile {
    fn default() -> Self {
        Self {
            service: UUID_EYESPY_SERVICE,
            serial: UUID_SERIAL_CHAR,
            wifi: UUID_WIFI_CHAR,
            wifi_check: UUID_WIFI_CHECK_CHAR,
            connection: UUID_CONNECTION_CHAR,
        }
    }
}
