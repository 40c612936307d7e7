pub mod backend_config;
pub mod provisioning_config;

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use directories::ProjectDirs;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::config::backend_config::BackendConfig;
use crate::config::provisioning_config::ProvisioningConfig;
use crate::utils::ensure_directory_exists;

const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub provisioning: ProvisioningConfig,
    pub backend: BackendConfig,
}

impl AppConfig {
    /// `<config dir>/eyespy-provisioning/config.json` for the current user.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com", "EyeSpy", "eyespy-provisioning")
            .ok_or_else(|| anyhow!("Could not determine a configuration directory"))?;
        Ok(dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Loads the config from a configuration file.
    pub async fn load_config(file_path: &Path) -> Result<Self> {
        if !file_path.exists() {
            warn!("Config file not found at {:?}, using default.", file_path);
            return Ok(Self::default());
        }

        let config_json = fs::read_to_string(file_path).await?;
        let config: Self = serde_json::from_str(&config_json)?;

        info!("Config loaded from {:?}", file_path);
        Ok(config)
    }

    /// Saves the current config to a configuration file.
    pub async fn save_config(&self, file_path: &Path) -> Result<()> {
        if let Some(config_dir) = file_path.parent() {
            ensure_directory_exists(config_dir).await?;
        }

        let config_json = match serde_json::to_string_pretty(&self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize config to JSON: {}", e);
                return Err(e.into());
            }
        };

        fs::write(file_path, config_json).await?;

        info!("Config saved to {:?}.", file_path);
        Ok(())
    }
}
