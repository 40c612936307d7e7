//! One provisioning attempt against one camera.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use tokio::sync::{Mutex, watch};
use tokio::time::{Instant, timeout, timeout_at};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::provisioning_config::{JoinProgress, ProvisioningConfig};
use crate::core::bluetooth::{ConnectionNotification, PeripheralTransport, Subscription, TransportError};
use crate::core::codec::{self, CameraIdentity, ConnectionStatus, WifiCheckRequest, WifiProvisioningRequest};
use crate::core::network::NetworkProbe;
use crate::core::provisioning::camera_id::CameraIdSource;
use crate::core::provisioning::error::ProvisioningError;
use crate::core::provisioning::report::{ProvisioningReport, ProvisioningSuccess, SessionOutcome};
use crate::core::provisioning::state::ProvisioningState;

/// Observes and cancels a running session from another task.
#[derive(Clone)]
pub struct SessionHandle {
    id: Uuid,
    state: watch::Receiver<ProvisioningState>,
    cancel_token: CancellationToken,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> ProvisioningState {
        *self.state.borrow()
    }

    /// Waits until the session reaches `target`. Returns `false` if it ended
    /// somewhere else first.
    pub async fn wait_for(&mut self, target: ProvisioningState) -> bool {
        match self.state.wait_for(|s| *s == target || s.is_terminal()).await {
            Ok(state) => *state == target,
            Err(_) => false,
        }
    }

    /// Aborts the session. Idempotent; a no-op once the session has ended.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }
}

/// Drives a connected camera through discovery, identity, network check,
/// credentials and confirmation.
///
/// A session runs once: `run` consumes it. Retrying means building a new
/// session, which rediscovers and resubscribes from scratch.
pub struct ProvisioningSession<T: PeripheralTransport> {
    id: Uuid,
    peripheral: Arc<Mutex<T>>,
    probe: Arc<dyn NetworkProbe>,
    camera_id: Box<dyn CameraIdSource>,
    config: ProvisioningConfig,
    state: watch::Sender<ProvisioningState>,
    visited: Vec<ProvisioningState>,
    identity: Option<CameraIdentity>,
    cancel_token: CancellationToken,
}

impl<T: PeripheralTransport> ProvisioningSession<T> {
    pub fn new(
        peripheral: Arc<Mutex<T>>,
        probe: Arc<dyn NetworkProbe>,
        camera_id: Box<dyn CameraIdSource>,
        config: ProvisioningConfig,
    ) -> Self {
        let (state, _) = watch::channel(ProvisioningState::Idle);
        Self {
            id: Uuid::new_v4(),
            peripheral,
            probe,
            camera_id,
            config,
            state,
            visited: vec![ProvisioningState::Idle],
            identity: None,
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            id: self.id,
            state: self.state.subscribe(),
            cancel_token: self.cancel_token.clone(),
        }
    }

    fn current(&self) -> ProvisioningState {
        *self.state.borrow()
    }

    fn enter(&mut self, next: ProvisioningState) {
        let current = self.current();
        debug_assert!(current.can_transition_to(next), "{:?} -> {:?}", current, next);
        info!("Session {}: {} -> {}", self.id, current, next);
        self.visited.push(next);
        self.state.send_replace(next);
    }

    /// Runs the handshake to a terminal state, or until cancelled.
    ///
    /// The peripheral is held exclusively for the whole run. Its connection is
    /// left as it was found.
    pub async fn run(mut self) -> ProvisioningReport {
        info!("Provisioning session {} started", self.id);

        let outcome = match self.peripheral.clone().try_lock_owned() {
            Ok(peripheral) => {
                let cancel_token = self.cancel_token.clone();
                tokio::select! {
                    biased;
                    _ = cancel_token.cancelled() => SessionOutcome::Cancelled,
                    outcome = self.drive(&*peripheral) => outcome,
                }
            }
            Err(_) => {
                warn!("Session {}: peripheral is in use by another session", self.id);
                self.enter(ProvisioningState::Failed);
                SessionOutcome::Failed {
                    error: ProvisioningError::DeviceBusy,
                    identity: None,
                }
            }
        };

        if outcome == SessionOutcome::Cancelled {
            info!("Session {} cancelled while {}", self.id, self.current());
        }
        ProvisioningReport::new(self.id, &outcome, self.visited.clone(), Utc::now())
    }

    async fn drive(&mut self, peripheral: &T) -> SessionOutcome {
        match self.handshake(peripheral).await {
            Ok(success) => {
                self.enter(ProvisioningState::Succeeded);
                info!("Session {}: camera {} is on {}", self.id, success.identity.serial, success.ssid);
                SessionOutcome::Succeeded(success)
            }
            Err(error) => {
                warn!("Session {} failed while {}: {}", self.id, self.current(), error);
                self.enter(ProvisioningState::Failed);
                SessionOutcome::Failed {
                    error,
                    identity: self.identity.clone(),
                }
            }
        }
    }

    async fn handshake(&mut self, peripheral: &T) -> Result<ProvisioningSuccess, ProvisioningError> {
        let profile = self.config.profile;

        self.enter(ProvisioningState::Discovering);
        self.bounded(peripheral.discover()).await.map_err(|e| match e {
            ProvisioningError::Timeout(_) | ProvisioningError::DeviceUnreachable(_) => e,
            other => ProvisioningError::DeviceUnreachable(other.to_string()),
        })?;

        self.enter(ProvisioningState::ReadingIdentity);
        let raw = self.bounded(peripheral.read(profile.service, profile.serial)).await?;
        if raw.is_empty() {
            return Err(TransportError::EmptyValue(profile.serial).into());
        }
        debug!("Identity payload: {:?}", String::from_utf8_lossy(&raw));
        let identity: CameraIdentity = codec::decode_bytes(&raw)?;
        info!("Camera identity: serial {}", identity.serial);
        self.identity = Some(identity.clone());

        self.enter(ProvisioningState::CheckingNetwork);
        let ssid = match timeout(self.config.step_timeout(), self.probe.current_network_name()).await {
            Ok(Some(ssid)) => ssid,
            Ok(None) | Err(_) => return Err(ProvisioningError::NetworkUnavailable),
        };
        let network_kind = if self.config.check_network {
            Some(self.check_network(peripheral, &ssid).await?)
        } else {
            None
        };
        let camera_id = timeout(self.config.step_timeout(), self.camera_id.camera_id(&identity))
            .await
            .map_err(|_| ProvisioningError::Timeout(ProvisioningState::CheckingNetwork))??;

        self.enter(ProvisioningState::SendingCredentials);
        let request = WifiProvisioningRequest {
            ssid: ssid.clone(),
            username: self.config.wifi_username.clone(),
            password: self.config.wifi_password.clone(),
            camera_id: camera_id.clone(),
        };
        debug!("Sending {:?}", request);
        let payload = codec::encode(&request)?;
        self.bounded(peripheral.write(profile.service, profile.wifi, payload.as_bytes()))
            .await?;
        let mut subscription = self
            .bounded(peripheral.subscribe(profile.service, profile.connection))
            .await?;

        self.enter(ProvisioningState::AwaitingConfirmation);
        let status = self.await_confirmation(&mut subscription).await;
        subscription.cancel();

        Ok(ProvisioningSuccess {
            identity,
            camera_id,
            ssid,
            network_kind,
            status: status?,
        })
    }

    /// Writes `{SSID}` to the check characteristic and reads back what the
    /// camera makes of that network.
    async fn check_network(&self, peripheral: &T, ssid: &str) -> Result<String, ProvisioningError> {
        let profile = self.config.profile;
        let payload = codec::encode(&WifiCheckRequest { ssid: ssid.to_string() })?;
        self.bounded(peripheral.write(profile.service, profile.wifi_check, payload.as_bytes()))
            .await?;

        let raw = self.bounded(peripheral.read(profile.service, profile.wifi_check)).await?;
        let network_kind = codec::decode_text(&raw)?;
        if network_kind.is_empty() {
            return Err(TransportError::EmptyValue(profile.wifi_check).into());
        }
        info!("Camera reports {:?} as {}", ssid, network_kind);
        Ok(network_kind)
    }

    /// Waits for a notification carrying a connected or failed state.
    /// Intermediate states only extend the wait up to the same deadline.
    async fn await_confirmation(
        &self,
        subscription: &mut Subscription,
    ) -> Result<ConnectionStatus, ProvisioningError> {
        let deadline = Instant::now() + self.config.confirmation_timeout();

        loop {
            let notification = timeout_at(deadline, subscription.next())
                .await
                .map_err(|_| ProvisioningError::Timeout(ProvisioningState::AwaitingConfirmation))?;

            let raw = match notification {
                Some(ConnectionNotification::Value(raw)) => raw,
                Some(ConnectionNotification::Error(e)) => {
                    return Err(ProvisioningError::NotificationError(e));
                }
                None => {
                    return Err(ProvisioningError::NotificationError(
                        "notifications stopped before the camera reported its connection state"
                            .to_string(),
                    ));
                }
            };

            let status: ConnectionStatus = codec::decode_bytes(&raw)?;
            match self.config.classify(&status) {
                JoinProgress::Connected => return Ok(status),
                JoinProgress::Failed => {
                    return Err(ProvisioningError::JoinFailed {
                        state: status.state,
                        reason: status.reason,
                    });
                }
                JoinProgress::Pending => {
                    info!("Camera network state {} (reason {}), waiting", status.state, status.reason);
                }
            }
        }
    }

    async fn bounded<V>(
        &self,
        operation: impl Future<Output = Result<V, TransportError>>,
    ) -> Result<V, ProvisioningError> {
        let state = self.current();
        match timeout(self.config.step_timeout(), operation).await {
            Ok(result) => result.map_err(ProvisioningError::from),
            Err(_) => Err(ProvisioningError::Timeout(state)),
        }
    }
}
