//! Constants used throughout the application
//! This module contains the GATT identifiers shared with the camera firmware,
//! plus timeouts and other tuning values.

use uuid::Uuid;

/// Advertised name fragment of an unconfigured EyeSpy camera
pub const CAMERA_NAME: &str = "EyeSpy";

/// The UUID of the EyeSpy provisioning service
pub const UUID_EYESPY_SERVICE: Uuid = Uuid::from_u128(0x136670f0_f95b_4ee8_bc3b_81eadb234268);

/// Read: `{Serial, PubKey}` of the camera
pub const UUID_SERIAL_CHAR: Uuid = Uuid::from_u128(0x136670f1_f95b_4ee8_bc3b_81eadb234268);

/// Write: `{SSID, User, Pass, UUID}`
pub const UUID_WIFI_CHAR: Uuid = Uuid::from_u128(0x136670f2_f95b_4ee8_bc3b_81eadb234268);

/// Write `{SSID}`, then read back the network type the camera sees
pub const UUID_WIFI_CHECK_CHAR: Uuid = Uuid::from_u128(0x136670f3_f95b_4ee8_bc3b_81eadb234268);

/// Notify: `{State, Reason}` whenever the camera's WiFi state changes
pub const UUID_CONNECTION_CHAR: Uuid = Uuid::from_u128(0x136670fb_f95b_4ee8_bc3b_81eadb234268);

/// Maximum number of connection retries
pub const MAX_CONNECT_RETRIES: u32 = 5;

/// Delay between connection retries in milliseconds
pub const CONNECT_RETRY_DELAY_MS: u64 = 1000;

/// Timeout for a single Bluetooth operation in seconds
pub const BLUETOOTH_OPERATION_TIMEOUT_SECS: u64 = 10;

/// How long to wait for the camera to report that it joined the network
pub const CONNECTION_CONFIRMATION_TIMEOUT_SECS: u64 = 30;

/// Scan duration in seconds
pub const DEFAULT_SCAN_DURATION_SECS: u64 = 5;

/// Minimum RSSI for a camera to be listed
pub const MIN_RSSI_THRESHOLD: i16 = -90;

/// Notifications buffered between the radio task and the session
pub const NOTIFICATION_BUFFER: usize = 16;

/// NetworkManager `NM_DEVICE_STATE_ACTIVATED`
pub const DEVICE_STATE_ACTIVATED: u32 = 100;

/// NetworkManager `NM_DEVICE_STATE_FAILED`
pub const DEVICE_STATE_FAILED: u32 = 120;
