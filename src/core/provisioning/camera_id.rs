//! Where the backend camera id written alongside the WiFi credentials comes from.

use log::warn;

use crate::backend::{CameraRegistration, CameraRegistry};
use crate::core::codec::CameraIdentity;
use crate::core::provisioning::error::ProvisioningError;

#[async_trait::async_trait]
pub trait CameraIdSource: Send + Sync {
    /// Called once per session, after the camera's identity has been read.
    async fn camera_id(&self, identity: &CameraIdentity) -> Result<String, ProvisioningError>;
}

/// The camera was registered before provisioning started.
#[async_trait::async_trait]
impl CameraIdSource for String {
    async fn camera_id(&self, _identity: &CameraIdentity) -> Result<String, ProvisioningError> {
        Ok(self.clone())
    }
}

/// Registers the camera with the backend using the identity it reported.
pub struct RegisterCamera<R> {
    registry: R,
    name: String,
    group_id: String,
}

impl<R: CameraRegistry> RegisterCamera<R> {
    pub fn new(registry: R, name: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            registry,
            name: name.into(),
            group_id: group_id.into(),
        }
    }
}

#[async_trait::async_trait]
impl<R: CameraRegistry> CameraIdSource for RegisterCamera<R> {
    async fn camera_id(&self, identity: &CameraIdentity) -> Result<String, ProvisioningError> {
        let registration = CameraRegistration {
            name: self.name.clone(),
            serial: identity.serial.clone(),
            public_key: identity.public_key.clone(),
            group_id: self.group_id.clone(),
        };
        match self.registry.register_camera(&registration).await {
            Ok(id) if !id.is_empty() => Ok(id),
            Ok(_) => Err(ProvisioningError::RegistrationFailed(
                "backend returned an empty camera id".to_string(),
            )),
            Err(e) => {
                warn!("Registering camera {} failed: {:#}", identity.serial, e);
                Err(ProvisioningError::RegistrationFailed(format!("{:#}", e)))
            }
        }
    }
}
