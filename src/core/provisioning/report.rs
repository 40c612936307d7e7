//! Turns a finished session into what the UI shows.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::core::codec::{CameraIdentity, ConnectionStatus};
use crate::core::provisioning::error::{ErrorKind, ProvisioningError};
use crate::core::provisioning::state::ProvisioningState;

/// Everything a successful handshake learned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningSuccess {
    pub identity: CameraIdentity,
    pub camera_id: String,
    pub ssid: String,
    pub network_kind: Option<String>,
    pub status: ConnectionStatus,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Succeeded(ProvisioningSuccess),
    Failed {
        error: ProvisioningError,
        /// Known when the failure happened after the identity was read.
        identity: Option<CameraIdentity>,
    },
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutcomeKind {
    Succeeded,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningReport {
    pub session_id: Uuid,
    pub outcome: OutcomeKind,
    pub error: Option<ErrorKind>,
    pub message: String,
    pub identity: Option<CameraIdentity>,
    pub camera_id: Option<String>,
    pub ssid: Option<String>,
    pub network_kind: Option<String>,
    pub status: Option<ConnectionStatus>,
    /// States the session went through, starting at `Idle`.
    pub states: Vec<ProvisioningState>,
    pub finished_at: DateTime<Utc>,
}

impl ProvisioningReport {
    pub fn new(
        session_id: Uuid,
        outcome: &SessionOutcome,
        states: Vec<ProvisioningState>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let mut report = Self {
            session_id,
            outcome: OutcomeKind::Cancelled,
            error: None,
            message: String::new(),
            identity: None,
            camera_id: None,
            ssid: None,
            network_kind: None,
            status: None,
            states,
            finished_at,
        };

        match outcome {
            SessionOutcome::Succeeded(success) => {
                report.outcome = OutcomeKind::Succeeded;
                report.message = format!(
                    "Camera {} joined {}",
                    success.identity.serial, success.ssid
                );
                report.identity = Some(success.identity.clone());
                report.camera_id = Some(success.camera_id.clone());
                report.ssid = Some(success.ssid.clone());
                report.network_kind = success.network_kind.clone();
                report.status = Some(success.status);
            }
            SessionOutcome::Failed { error, identity } => {
                report.outcome = OutcomeKind::Failed;
                report.error = Some(error.kind());
                report.message = error.to_string();
                report.identity = identity.clone();
            }
            SessionOutcome::Cancelled => {
                let at = report.states.last().copied().unwrap_or(ProvisioningState::Idle);
                report.message = format!("Provisioning cancelled while {}", at);
            }
        }
        report
    }

    pub fn is_success(&self) -> bool {
        self.outcome == OutcomeKind::Succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ProvisioningState::*;

    fn identity() -> CameraIdentity {
        CameraIdentity {
            serial: "SN-42".into(),
            public_key: "abc".into(),
        }
    }

    #[test]
    fn success_carries_the_identity() {
        let outcome = SessionOutcome::Succeeded(ProvisioningSuccess {
            identity: identity(),
            camera_id: "cam-1".into(),
            ssid: "HomeWifi".into(),
            network_kind: None,
            status: ConnectionStatus { state: 100, reason: 0 },
        });
        let report = ProvisioningReport::new(Uuid::nil(), &outcome, vec![Idle, Succeeded], Utc::now());

        assert!(report.is_success());
        assert_eq!(report.error, None);
        assert_eq!(report.identity, Some(identity()));
        assert_eq!(report.message, "Camera SN-42 joined HomeWifi");
    }

    #[test]
    fn failure_carries_kind_and_message() {
        let outcome = SessionOutcome::Failed {
            error: ProvisioningError::NetworkUnavailable,
            identity: Some(identity()),
        };
        let report = ProvisioningReport::new(Uuid::nil(), &outcome, vec![Idle, Failed], Utc::now());

        assert_eq!(report.outcome, OutcomeKind::Failed);
        assert_eq!(report.error, Some(ErrorKind::NetworkUnavailable));
        assert!(report.message.contains("location permissions"));
        assert_eq!(report.camera_id, None);
    }

    #[test]
    fn cancellation_names_the_interrupted_step() {
        let report = ProvisioningReport::new(
            Uuid::nil(),
            &SessionOutcome::Cancelled,
            vec![Idle, Discovering, ReadingIdentity],
            Utc::now(),
        );
        assert_eq!(report.outcome, OutcomeKind::Cancelled);
        assert_eq!(report.message, "Provisioning cancelled while reading identity");
    }

    #[test]
    fn serializes_for_the_ui() {
        let outcome = SessionOutcome::Failed {
            error: ProvisioningError::DeviceBusy,
            identity: None,
        };
        let report = ProvisioningReport::new(Uuid::nil(), &outcome, vec![Idle, Failed], Utc::now());
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["outcome"], "Failed");
        assert_eq!(value["error"], "DeviceBusy");
        assert_eq!(value["states"], serde_json::json!(["Idle", "Failed"]));
    }
}
