use crate::domain::PoStatsError;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CLOSE_TIMEOUT_MINUTES: u32 = 30;
pub const DEFAULT_STATUS_TARGET_URL_BASE: &str = "https://postats.apsim.info";
pub const DEFAULT_STATUS_CONTEXT: &str = "APSIM.POStats";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceConfig {
    /// Minutes an open run waits for uploads before it is closed anyway.
    pub close_timeout_minutes: u32,
    pub status_target_url_base: String,
    pub status_context: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            close_timeout_minutes: DEFAULT_CLOSE_TIMEOUT_MINUTES,
            status_target_url_base: DEFAULT_STATUS_TARGET_URL_BASE.to_string(),
            status_context: DEFAULT_STATUS_CONTEXT.to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn close_timeout(&self) -> Duration {
        Duration::minutes(i64::from(self.close_timeout_minutes))
    }

    pub fn target_url(&self, run_number: u32) -> String {
        format!(
            "{}/{}",
            self.status_target_url_base.trim_end_matches('/'),
            run_number
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read service config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse service config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl From<ConfigError> for PoStatsError {
    fn from(error: ConfigError) -> Self {
        let message = error.to_string();
        match error {
            ConfigError::Read { .. } => PoStatsError::io_system("IO.CONFIG_READ", message),
            ConfigError::Parse { .. } => PoStatsError::input_validation("INPUT.CONFIG", message),
        }
    }
}

pub fn load_service_config(config_path: impl AsRef<Path>) -> Result<ServiceConfig, ConfigError> {
    let config_path = config_path.as_ref();
    let source = fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
        path: config_path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&source).map_err(|source| ConfigError::Parse {
        path: config_path.to_path_buf(),
        source,
    })
}
