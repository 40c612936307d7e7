//! Bluetooth connection handling for EyeSpy cameras
//! This module connects to and disconnects from a camera, and adapts a
//! connected bluest device to the [`PeripheralTransport`] seam.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use anyhow::{Result, anyhow};
use bluest::error::ErrorKind;
use bluest::{Adapter, Characteristic, Device, Uuid};
use futures_util::{Stream, StreamExt};
use log::{debug, error, info, warn};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::core::bluetooth::constants::NOTIFICATION_BUFFER;
use crate::core::bluetooth::transport::{PeripheralTransport, Subscription, TransportError};
use crate::core::bluetooth::types::ConnectionNotification;

/// Connection manager for cameras
#[derive(Clone)]
pub struct ConnectionManager {
    adapter: Adapter,
    max_retries: u32,
    retry_delay: u64,
}

impl ConnectionManager {
    pub fn new(adapter: Adapter, max_retries: u32, retry_delay: u64) -> Self {
        Self { adapter, max_retries, retry_delay }
    }

    /// Connect to the camera with retry mechanism
    pub async fn connect_with_retry(&self, device: &Device) -> Result<()> {
        let mut retry_count = 0;
        let mut last_error = None;

        while retry_count < self.max_retries {
            match self.try_connect(device).await {
                Ok(()) => {
                    info!("Successfully connected to device {}", device.id());
                    return Ok(());
                }
                Err(e) => {
                    warn!("Connection attempt {} failed: {}", retry_count + 1, e);
                    last_error = Some(e);

                    if retry_count + 1 < self.max_retries {
                        info!("Retrying connection in {} ms...", self.retry_delay);
                        tokio::time::sleep(Duration::from_millis(self.retry_delay)).await;
                    }
                }
            }
            retry_count += 1;
        }

        Err(last_error.unwrap_or_else(|| anyhow!("Failed to connect after {} attempts", self.max_retries)))
    }

    async fn try_connect(&self, device: &Device) -> Result<()> {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Device details - ID: {}, Name: {:?}", device.id(), name);

        if !device.is_connected().await {
            info!("Initiating connection to {}...", device.id());
            self.adapter.connect_device(device).await?;
        }
        Ok(())
    }

    /// Disconnect from the camera
    pub async fn disconnect(&self, device: &Device) -> Result<()> {
        if device.is_connected().await {
            info!("Disconnecting from device {}", device.id());
            self.adapter.disconnect_device(device).await?;
            info!("Successfully disconnected");
        } else {
            info!("Device {} not connected", device.id());
        }
        Ok(())
    }
}

/// [`PeripheralTransport`] over a connected bluest device.
///
/// The connection itself belongs to whoever created the device; this type
/// never connects or disconnects.
pub struct BluestTransport {
    device: Device,
    characteristics: Mutex<HashMap<(Uuid, Uuid), Characteristic>>,
}

impl BluestTransport {
    pub fn new(device: Device) -> Self {
        Self {
            device,
            characteristics: Mutex::new(HashMap::new()),
        }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    async fn characteristic(
        &self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<Characteristic, TransportError> {
        self.characteristics
            .lock()
            .await
            .get(&(service, characteristic))
            .cloned()
            .ok_or(TransportError::CharacteristicMissing { service, characteristic })
    }

    fn unreachable(&self, e: bluest::Error) -> TransportError {
        TransportError::DeviceUnreachable(format!("{}: {}", self.device.id(), e))
    }
}

#[async_trait::async_trait]
impl PeripheralTransport for BluestTransport {
    async fn discover(&self) -> Result<(), TransportError> {
        if !self.device.is_connected().await {
            return Err(TransportError::DeviceUnreachable(format!(
                "{} is not connected",
                self.device.id()
            )));
        }

        info!("Discovering services on {}...", self.device.id());
        let services = self.device.discover_services().await.map_err(|e| self.unreachable(e))?;

        let mut table = HashMap::new();
        for service in services {
            let characteristics = service
                .discover_characteristics()
                .await
                .map_err(|e| self.unreachable(e))?;
            for characteristic in characteristics {
                debug!("Found characteristic {} in service {}", characteristic.uuid(), service.uuid());
                table.insert((service.uuid(), characteristic.uuid()), characteristic);
            }
        }
        info!("Discovered {} characteristics", table.len());

        *self.characteristics.lock().await = table;
        Ok(())
    }

    async fn read(&self, service: Uuid, characteristic: Uuid) -> Result<Vec<u8>, TransportError> {
        let handle = self.characteristic(service, characteristic).await?;
        let value = handle.read().await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => TransportError::CharacteristicMissing { service, characteristic },
            _ => self.unreachable(e),
        })?;

        if value.is_empty() {
            return Err(TransportError::EmptyValue(characteristic));
        }
        Ok(value)
    }

    async fn write(
        &self,
        service: Uuid,
        characteristic: Uuid,
        value: &[u8],
    ) -> Result<(), TransportError> {
        let handle = self.characteristic(service, characteristic).await?;
        debug!("Writing {} bytes to {}", value.len(), characteristic);
        handle.write(value).await.map_err(|e| match e.kind() {
            ErrorKind::NotConnected => self.unreachable(e),
            _ => TransportError::WriteRejected { characteristic, reason: e.to_string() },
        })
    }

    async fn subscribe(
        &self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<Subscription, TransportError> {
        let handle = self.characteristic(service, characteristic).await?;
        spawn_subscription(characteristic, move |tx, ready_tx, token| async move {
            forward_notifications(characteristic, handle.notify(), tx, ready_tx, token).await
        })
        .await
    }
}

type ReadySender = oneshot::Sender<Result<(), String>>;

/// Spawns `task` to feed a new subscription and waits until it reports ready.
/// If this future is dropped first, the task is cancelled.
async fn spawn_subscription<F, Fut>(characteristic: Uuid, task: F) -> Result<Subscription, TransportError>
where
    F: FnOnce(mpsc::Sender<ConnectionNotification>, ReadySender, CancellationToken) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(NOTIFICATION_BUFFER);
    let (ready_tx, ready_rx) = oneshot::channel();
    let cancel_token = CancellationToken::new();
    let pending = cancel_token.clone().drop_guard();

    tokio::spawn(task(tx, ready_tx, cancel_token.clone()));

    let ready = ready_rx.await;
    pending.disarm();
    match ready {
        Ok(Ok(())) => Ok(Subscription::new(characteristic, rx, move || cancel_token.cancel())),
        Ok(Err(reason)) => Err(TransportError::SubscribeFailed { characteristic, reason }),
        Err(_) => Err(TransportError::SubscribeFailed {
            characteristic,
            reason: "notification task exited".to_string(),
        }),
    }
}

/// Opens a notification stream and forwards it to `tx` until the stream
/// ends, the receiver goes away, or `token` is cancelled.
async fn forward_notifications<S, E>(
    characteristic: Uuid,
    open: impl Future<Output = Result<S, E>>,
    tx: mpsc::Sender<ConnectionNotification>,
    ready_tx: ReadySender,
    token: CancellationToken,
) where
    S: Stream<Item = Result<Vec<u8>, E>>,
    E: Display,
{
    info!("Subscribing to notifications on {}...", characteristic);
    let stream = tokio::select! {
        _ = token.cancelled() => {
            info!("Subscription to {} abandoned before it was ready", characteristic);
            return;
        }
        result = open => match result {
            Ok(stream) => stream,
            Err(e) => {
                let _ = ready_tx.send(Err(e.to_string()));
                return;
            }
        },
    };
    if ready_tx.send(Ok(())).is_err() {
        info!("Subscription to {} abandoned before it was ready", characteristic);
        return;
    }
    futures_util::pin_mut!(stream);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tx.closed() => break,
            item = stream.next() => match item {
                Some(Ok(value)) => {
                    debug!("Received notification: {:?}", value);
                    if tx.send(ConnectionNotification::Value(value)).await.is_err() {
                        break;
                    }
                }
                Some(Err(e)) => {
                    error!("Error in notification stream: {}", e);
                    let _ = tx.send(ConnectionNotification::Error(e.to_string())).await;
                    break;
                }
                None => break,
            }
        }
    }
    info!("Notification stream on {} ended", characteristic);
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{future, stream};
    use tokio::time::timeout;

    type Notifications = stream::Pending<Result<Vec<u8>, String>>;

    /// Runs `forward_notifications` behind `spawn_subscription` and reports
    /// on `done` once the task has finished.
    async fn subscribe_to<S>(
        open: impl Future<Output = Result<S, String>> + Send + 'static,
        done: oneshot::Sender<()>,
    ) -> Result<Subscription, TransportError>
    where
        S: Stream<Item = Result<Vec<u8>, String>> + Send + 'static,
    {
        spawn_subscription(Uuid::nil(), move |tx, ready_tx, token| async move {
            forward_notifications(Uuid::nil(), open, tx, ready_tx, token).await;
            let _ = done.send(());
        })
        .await
    }

    #[tokio::test]
    async fn forwards_values_then_the_stream_error() {
        let (done_tx, done_rx) = oneshot::channel();
        let items = stream::iter(vec![Ok(b"a".to_vec()), Err("link lost".to_string())]);
        let mut subscription = subscribe_to(future::ready(Ok(items)), done_tx).await.unwrap();

        assert_eq!(subscription.next().await, Some(ConnectionNotification::Value(b"a".to_vec())));
        assert_eq!(
            subscription.next().await,
            Some(ConnectionNotification::Error("link lost".into()))
        );
        assert_eq!(subscription.next().await, None);
        assert!(done_rx.await.is_ok());
    }

    #[tokio::test]
    async fn open_failure_is_reported_as_subscribe_failed() {
        let (done_tx, _done_rx) = oneshot::channel();
        let result = subscribe_to(future::ready(Err::<Notifications, _>("not permitted".to_string())), done_tx).await;

        assert_eq!(
            result.err(),
            Some(TransportError::SubscribeFailed {
                characteristic: Uuid::nil(),
                reason: "not permitted".into(),
            })
        );
    }

    #[tokio::test]
    async fn cancelled_subscription_stops_the_task() {
        let (done_tx, done_rx) = oneshot::channel();
        let mut subscription = subscribe_to(future::ready(Ok::<Notifications, String>(stream::pending())), done_tx)
            .await
            .unwrap();

        assert!(subscription.cancel());
        assert!(timeout(Duration::from_secs(1), done_rx).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_subscribe_stops_the_task() {
        let (done_tx, done_rx) = oneshot::channel();
        let opening = subscribe_to(future::pending::<Result<Notifications, String>>(), done_tx);

        assert!(timeout(Duration::from_secs(10), opening).await.is_err());
        assert!(timeout(Duration::from_secs(1), done_rx).await.is_ok());
    }
}
