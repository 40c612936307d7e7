use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use bluest::{Adapter, Device};
use futures_util::StreamExt;
use log::{debug, info};
use regex::Regex;

use crate::core::bluetooth::constants::{CAMERA_NAME, MIN_RSSI_THRESHOLD};
use crate::core::bluetooth::types::BluetoothDevice;

pub struct BluetoothScanner {
    adapter: Adapter,
    devices: Arc<Mutex<HashMap<String, Device>>>,
}

impl BluetoothScanner {
    pub fn new(adapter: Adapter, devices: Arc<Mutex<HashMap<String, Device>>>) -> Self {
        Self { adapter, devices }
    }

    /// Scans for EyeSpy cameras until `duration` elapses. Cameras already
    /// connected to this host are included without an RSSI check.
    pub async fn scan(&mut self, duration: Duration) -> Result<Vec<BluetoothDevice>> {
        self.devices.lock().unwrap_or_else(|e| e.into_inner()).clear();
        let mut found = Vec::new();

        info!("Checking for connected devices");
        for device in self.adapter.connected_devices().await? {
            if is_new_camera(&found, &device.id().to_string(), &device_name(&device)) {
                found.push(self.remember(device).await);
            }
        }
        info!("{} camera(s) already connected", found.len());

        info!("Starting bluetooth scan for {:?}", duration);
        let mut scan_stream = self.adapter.scan(&[]).await?;
        let deadline = tokio::time::sleep(duration);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                result = scan_stream.next() => {
                    match result {
                        Some(discovered) => {
                            let device = discovered.device;
                            debug!("Found device - Device: {:?}, RSSI: {:?}", device, discovered.rssi);
                            let strong_enough = discovered.rssi.is_some_and(|rssi| rssi >= MIN_RSSI_THRESHOLD);
                            let id = device.id().to_string();
                            if strong_enough && is_new_camera(&found, &id, &device_name(&device)) {
                                found.push(self.remember(device).await);
                            }
                        }
                        None => {
                            info!("Bluetooth scan stream has ended.");
                            break;
                        }
                    }
                }
                _ = &mut deadline => break,
            }
        }

        info!("Scan complete, {} camera(s) found", found.len());
        Ok(found)
    }

    async fn remember(&self, device: Device) -> BluetoothDevice {
        let name = device_name(&device);
        let id = device.id().to_string();
        let rssi = device.rssi().await.unwrap_or(0);
        let address = extract_mac_address(&id).unwrap_or_else(|| "N/A".to_string());
        let is_connected = device.is_connected().await;

        info!(
            "Found EyeSpy camera: Address: {}, ID: {}, Name: {:?}, RSSI: {}, Is Connected: {}",
            address, id, name, rssi, is_connected
        );

        self.devices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.clone(), device);

        BluetoothDevice::new(id, name, address, rssi, is_connected)
    }
}

fn device_name(device: &Device) -> String {
    device.name().unwrap_or_else(|_| "Unknown".to_string())
}

/// An EyeSpy camera not yet in `found`
fn is_new_camera(found: &[BluetoothDevice], id: &str, name: &str) -> bool {
    name.contains(CAMERA_NAME) && !found.iter().any(|d| d.id == id)
}

fn extract_mac_address(device_id_str: &str) -> Option<String> {
    let re = Regex::new(r"([0-9A-Fa-f]{2}[:-]){5}([0-9A-Fa-f]{2})").ok()?;
    re.find_iter(device_id_str).last().map(|m| m.as_str().to_uppercase())
}
