//! Scriptable in-memory transport for session tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::core::bluetooth::constants::NOTIFICATION_BUFFER;
use crate::core::bluetooth::transport::{PeripheralTransport, Subscription, TransportError};
use crate::core::bluetooth::types::{ConnectionNotification, GattProfile};

#[derive(Default)]
struct MockState {
    unreachable: bool,
    discovered: bool,
    values: HashMap<Uuid, Vec<u8>>,
    rejected: HashSet<Uuid>,
    hanging: HashSet<Uuid>,
    notifications: Vec<ConnectionNotification>,
    keep_stream_open: bool,
    open_senders: Vec<mpsc::Sender<ConnectionNotification>>,
    reads: Vec<Uuid>,
    writes: Vec<(Uuid, Vec<u8>)>,
    subscriptions: usize,
}

#[derive(Default)]
pub struct MockTransport {
    service: Uuid,
    state: Mutex<MockState>,
    released: Arc<AtomicUsize>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            service: GattProfile::default().service,
            ..Self::default()
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn unreachable(self) -> Self {
        self.state().unreachable = true;
        self
    }

    pub fn with_value(self, characteristic: Uuid, value: impl Into<Vec<u8>>) -> Self {
        self.state().values.insert(characteristic, value.into());
        self
    }

    pub fn rejecting(self, characteristic: Uuid) -> Self {
        self.state().rejected.insert(characteristic);
        self
    }

    /// Reads, writes and subscriptions on `characteristic` never complete.
    pub fn hanging(self, characteristic: Uuid) -> Self {
        self.state().hanging.insert(characteristic);
        self
    }

    pub fn notifying(self, notification: ConnectionNotification) -> Self {
        self.state().notifications.push(notification);
        self
    }

    /// Keeps the notification stream open after the scripted notifications.
    pub fn holding_stream_open(self) -> Self {
        self.state().keep_stream_open = true;
        self
    }

    pub fn reads(&self) -> Vec<Uuid> {
        self.state().reads.clone()
    }

    pub fn writes(&self) -> Vec<(Uuid, Vec<u8>)> {
        self.state().writes.clone()
    }

    pub fn subscriptions(&self) -> usize {
        self.state().subscriptions
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    fn check(&self, service: Uuid) -> Result<(), TransportError> {
        let state = self.state();
        if state.unreachable {
            return Err(TransportError::DeviceUnreachable("mock device is gone".into()));
        }
        if !state.discovered || service != self.service {
            return Err(TransportError::CharacteristicMissing {
                service,
                characteristic: Uuid::nil(),
            });
        }
        Ok(())
    }

    async fn stall(&self, characteristic: Uuid) {
        let hangs = self.state().hanging.contains(&characteristic);
        if hangs {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait::async_trait]
impl PeripheralTransport for MockTransport {
    async fn discover(&self) -> Result<(), TransportError> {
        let mut state = self.state();
        if state.unreachable {
            return Err(TransportError::DeviceUnreachable("mock device is gone".into()));
        }
        state.discovered = true;
        Ok(())
    }

    async fn read(&self, service: Uuid, characteristic: Uuid) -> Result<Vec<u8>, TransportError> {
        self.check(service)?;
        self.state().reads.push(characteristic);
        self.stall(characteristic).await;
        let state = self.state();
        match state.values.get(&characteristic) {
            None => Err(TransportError::CharacteristicMissing { service, characteristic }),
            Some(value) if value.is_empty() => Err(TransportError::EmptyValue(characteristic)),
            Some(value) => Ok(value.clone()),
        }
    }

    async fn write(
        &self,
        service: Uuid,
        characteristic: Uuid,
        value: &[u8],
    ) -> Result<(), TransportError> {
        self.check(service)?;
        self.state().writes.push((characteristic, value.to_vec()));
        self.stall(characteristic).await;
        let state = self.state();
        if state.rejected.contains(&characteristic) {
            return Err(TransportError::WriteRejected {
                characteristic,
                reason: "mock rejected the write".into(),
            });
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<Subscription, TransportError> {
        self.check(service)?;
        self.stall(characteristic).await;
        let mut state = self.state();
        state.subscriptions += 1;

        let (tx, rx) = mpsc::channel(NOTIFICATION_BUFFER);
        for notification in state.notifications.drain(..) {
            let _ = tx.try_send(notification);
        }
        if state.keep_stream_open {
            state.open_senders.push(tx);
        }

        let released = self.released.clone();
        Ok(Subscription::new(characteristic, rx, move || {
            released.fetch_add(1, Ordering::SeqCst);
        }))
    }
}
