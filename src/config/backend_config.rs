use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the REST API, without a trailing slash.
    pub api_link: String,

    /// Id of the signed-in user who will own the camera.
    pub user_id: String,

    /// Bearer token issued by the identity provider.
    pub access_token: Option<String>,
}
