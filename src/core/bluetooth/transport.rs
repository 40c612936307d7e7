//! Transport seam between the provisioning session and a connected peripheral.
//! The session only ever talks to a camera through [`PeripheralTransport`].

use log::debug;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::core::bluetooth::types::ConnectionNotification;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("device unreachable: {0}")]
    DeviceUnreachable(String),
    #[error("characteristic {characteristic} not found in service {service}")]
    CharacteristicMissing { service: Uuid, characteristic: Uuid },
    #[error("characteristic {0} has no value")]
    EmptyValue(Uuid),
    #[error("write to {characteristic} rejected: {reason}")]
    WriteRejected { characteristic: Uuid, reason: String },
    #[error("could not subscribe to {characteristic}: {reason}")]
    SubscribeFailed { characteristic: Uuid, reason: String },
}

/// Operations a provisioning session needs from one connected peripheral.
///
/// `discover` must succeed before any characteristic operation. None of the
/// calls carry their own timeout; the session bounds every call.
#[async_trait::async_trait]
pub trait PeripheralTransport: Send + Sync {
    /// Enumerate services and characteristics on the device
    async fn discover(&self) -> Result<(), TransportError>;

    /// Read the current value of a characteristic
    async fn read(&self, service: Uuid, characteristic: Uuid) -> Result<Vec<u8>, TransportError>;

    /// Write with response
    async fn write(
        &self,
        service: Uuid,
        characteristic: Uuid,
        value: &[u8],
    ) -> Result<(), TransportError>;

    /// Start receiving notifications. Updates flow until the returned
    /// [`Subscription`] is cancelled or dropped, or the device goes away.
    async fn subscribe(
        &self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<Subscription, TransportError>;
}

/// A live notification subscription.
///
/// The release hook runs exactly once: on the first `cancel` or on drop.
pub struct Subscription {
    characteristic: Uuid,
    receiver: mpsc::Receiver<ConnectionNotification>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(
        characteristic: Uuid,
        receiver: mpsc::Receiver<ConnectionNotification>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            characteristic,
            receiver,
            release: Some(Box::new(release)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }

    /// Next notification, or `None` once the stream has closed or the
    /// subscription was cancelled.
    pub async fn next(&mut self) -> Option<ConnectionNotification> {
        if !self.is_active() {
            return None;
        }
        self.receiver.recv().await
    }

    /// Releases the subscription. Returns `false` if it was already released.
    pub fn cancel(&mut self) -> bool {
        match self.release.take() {
            Some(release) => {
                debug!("Releasing subscription on {}", self.characteristic);
                self.receiver.close();
                release();
                true
            }
            None => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counted() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let hook = count.clone();
        (count, move || {
            hook.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn delivers_notifications_in_order() {
        let (tx, rx) = mpsc::channel(4);
        let (_, release) = counted();
        let mut subscription = Subscription::new(Uuid::nil(), rx, release);

        tx.send(ConnectionNotification::Value(vec![1])).await.unwrap();
        tx.send(ConnectionNotification::Error("gone".into())).await.unwrap();
        drop(tx);

        assert_eq!(subscription.next().await, Some(ConnectionNotification::Value(vec![1])));
        assert_eq!(
            subscription.next().await,
            Some(ConnectionNotification::Error("gone".into()))
        );
        assert_eq!(subscription.next().await, None);
    }

    #[tokio::test]
    async fn release_runs_once_across_cancel_and_drop() {
        let (_tx, rx) = mpsc::channel(4);
        let (count, release) = counted();
        let mut subscription = Subscription::new(Uuid::nil(), rx, release);

        assert!(subscription.cancel());
        assert!(!subscription.cancel());
        assert!(subscription.next().await.is_none());
        drop(subscription);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_releases_an_active_subscription() {
        let (_tx, rx) = mpsc::channel(4);
        let (count, release) = counted();
        drop(Subscription::new(Uuid::nil(), rx, release));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
