//! Bluetooth manager for EyeSpy provisioning
//! This module owns the adapter and the connection lifecycle of cameras.
//! Provisioning sessions borrow the connected transports it hands out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use bluest::{Adapter, Device};
use log::info;
use tokio::sync::Mutex;

use crate::core::bluetooth::connection::{BluestTransport, ConnectionManager};
use crate::core::bluetooth::constants::{CONNECT_RETRY_DELAY_MS, MAX_CONNECT_RETRIES};
use crate::core::bluetooth::scanner::BluetoothScanner;
use crate::core::bluetooth::types::BluetoothDevice;

/// Manages Bluetooth operations
pub struct BluetoothManager {
    /// Map of device ids to devices seen by the last scan
    devices: Arc<std::sync::Mutex<HashMap<String, Device>>>,
    /// Connected cameras
    connected: HashMap<String, Arc<Mutex<BluestTransport>>>,
    connection_manager: ConnectionManager,
    scanner: BluetoothScanner,
}

impl BluetoothManager {
    pub async fn new() -> Result<Self> {
        let adapter = Adapter::default()
            .await
            .ok_or_else(|| anyhow!("No Bluetooth adapter found"))?;
        adapter.wait_available().await?;
        info!("Bluetooth adapter is available.");

        let devices = Arc::new(std::sync::Mutex::new(HashMap::new()));
        let connection_manager =
            ConnectionManager::new(adapter.clone(), MAX_CONNECT_RETRIES, CONNECT_RETRY_DELAY_MS);
        let scanner = BluetoothScanner::new(adapter, devices.clone());

        Ok(Self {
            devices,
            connected: HashMap::new(),
            connection_manager,
            scanner,
        })
    }

    pub async fn scan(&mut self, duration: Duration) -> Result<Vec<BluetoothDevice>> {
        self.scanner.scan(duration).await
    }

    /// Connects to a camera found by the last scan and returns its transport.
    pub async fn connect_device(&mut self, device_id: &str) -> Result<Arc<Mutex<BluestTransport>>> {
        if let Some(transport) = self.connected.get(device_id) {
            if transport.lock().await.device().is_connected().await {
                info!("Device already connected.");
                return Ok(transport.clone());
            }
        }

        let device = {
            let devices = self.devices.lock().unwrap_or_else(|e| e.into_inner());
            devices
                .get(device_id)
                .cloned()
                .ok_or_else(|| anyhow!("Device not found with ID: {}", device_id))?
        };

        self.connection_manager.connect_with_retry(&device).await?;

        let transport = Arc::new(Mutex::new(BluestTransport::new(device)));
        self.connected.insert(device_id.to_string(), transport.clone());
        info!("Device {} connected and ready for provisioning.", device_id);
        Ok(transport)
    }

    /// Disconnects a camera. Waits for any session still using it to finish.
    pub async fn disconnect(&mut self, device_id: &str) -> Result<()> {
        let transport = self
            .connected
            .remove(device_id)
            .ok_or_else(|| anyhow!("No device connected with ID: {}", device_id))?;
        let device = transport.lock().await.device().clone();
        self.connection_manager.disconnect(&device).await
    }
}
