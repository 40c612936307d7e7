use serde::Serialize;
use thiserror::Error;

use crate::core::bluetooth::TransportError;
use crate::core::codec::CodecError;
use crate::core::provisioning::state::ProvisioningState;

/// Why a session failed. Every variant is terminal for its session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProvisioningError {
    #[error("device unreachable: {0}")]
    DeviceUnreachable(String),
    #[error("another session is already provisioning this device")]
    DeviceBusy,
    #[error("{0}")]
    CharacteristicMissing(String),
    #[error("{0}")]
    EmptyValue(String),
    #[error("{0}")]
    MalformedPayload(String),
    #[error("{0}")]
    SchemaMismatch(String),
    #[error("{0}")]
    WriteRejected(String),
    #[error("the phone's WiFi network name is unavailable, check location permissions")]
    NetworkUnavailable,
    #[error("camera registration failed: {0}")]
    RegistrationFailed(String),
    #[error("connection notification failed: {0}")]
    NotificationError(String),
    #[error("camera could not join the network (state {state}, reason {reason})")]
    JoinFailed { state: u32, reason: u32 },
    #[error("no response from the camera while {0}")]
    Timeout(ProvisioningState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    DeviceUnreachable,
    DeviceBusy,
    CharacteristicMissing,
    EmptyValue,
    MalformedPayload,
    SchemaMismatch,
    WriteRejected,
    NetworkUnavailable,
    RegistrationFailed,
    NotificationError,
    JoinFailed,
    Timeout,
}

impl ProvisioningError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DeviceUnreachable(_) => ErrorKind::DeviceUnreachable,
            Self::DeviceBusy => ErrorKind::DeviceBusy,
            Self::CharacteristicMissing(_) => ErrorKind::CharacteristicMissing,
            Self::EmptyValue(_) => ErrorKind::EmptyValue,
            Self::MalformedPayload(_) => ErrorKind::MalformedPayload,
            Self::SchemaMismatch(_) => ErrorKind::SchemaMismatch,
            Self::WriteRejected(_) => ErrorKind::WriteRejected,
            Self::NetworkUnavailable => ErrorKind::NetworkUnavailable,
            Self::RegistrationFailed(_) => ErrorKind::RegistrationFailed,
            Self::NotificationError(_) => ErrorKind::NotificationError,
            Self::JoinFailed { .. } => ErrorKind::JoinFailed,
            Self::Timeout(_) => ErrorKind::Timeout,
        }
    }
}

impl From<TransportError> for ProvisioningError {
    fn from(e: TransportError) -> Self {
        let message = e.to_string();
        match e {
            TransportError::DeviceUnreachable(_) => Self::DeviceUnreachable(message),
            TransportError::CharacteristicMissing { .. } => Self::CharacteristicMissing(message),
            TransportError::EmptyValue(_) => Self::EmptyValue(message),
            TransportError::WriteRejected { .. } => Self::WriteRejected(message),
            TransportError::SubscribeFailed { .. } => Self::NotificationError(message),
        }
    }
}

impl From<CodecError> for ProvisioningError {
    fn from(e: CodecError) -> Self {
        let message = e.to_string();
        match e {
            CodecError::MalformedPayload(_) => Self::MalformedPayload(message),
            CodecError::SchemaMismatch(_) => Self::SchemaMismatch(message),
        }
    }
}
