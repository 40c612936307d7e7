//! Backend collaborator
//! Registers a camera with the EyeSpy backend so it can be handed the id the
//! backend assigned to it.

use anyhow::{Context, Result, anyhow};
use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::config::backend_config::BackendConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraRegistration {
    pub name: String,
    pub serial: String,
    pub public_key: String,
    #[serde(skip)]
    pub group_id: String,
}

#[async_trait::async_trait]
pub trait CameraRegistry: Send + Sync {
    /// Registers the camera and returns the id the backend assigned to it.
    async fn register_camera(&self, registration: &CameraRegistration) -> Result<String>;
}

#[derive(Deserialize)]
struct RegisteredCamera {
    id: String,
}

/// Talks to the REST backend with a bearer token.
pub struct HttpCameraRegistry {
    client: reqwest::Client,
    config: BackendConfig,
}

impl HttpCameraRegistry {
    pub fn new(config: BackendConfig) -> Result<Self> {
        if config.api_link.is_empty() {
            return Err(anyhow!("backend api_link is not configured"));
        }
        if config.user_id.is_empty() {
            return Err(anyhow!("backend user_id is not configured"));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            config,
        })
    }

    fn register_url(&self, group_id: &str) -> String {
        format!(
            "{}/users/{}/groups/{}/cameras",
            self.config.api_link.trim_end_matches('/'),
            self.config.user_id,
            group_id
        )
    }
}

#[async_trait::async_trait]
impl CameraRegistry for HttpCameraRegistry {
    async fn register_camera(&self, registration: &CameraRegistration) -> Result<String> {
        let url = self.register_url(&registration.group_id);
        info!("Registering camera {} in group {}", registration.serial, registration.group_id);

        let mut request = self.client.put(&url).json(registration);
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("PUT {} failed", url))?;
        let status = response.status();
        if !status.is_success() {
            error!("Error in register_camera status code: {}", status);
            return Err(anyhow!("backend answered {} to camera registration", status));
        }

        let camera: RegisteredCamera = response
            .json()
            .await
            .context("backend returned an unexpected registration body")?;
        info!("Camera {} registered as {}", registration.serial, camera.id);
        Ok(camera.id)
    }
}
