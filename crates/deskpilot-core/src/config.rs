use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

/// Top-level configuration for Deskpilot.
///
/// Loaded from `~/.deskpilot/config.toml` by default. Each section configures
/// one component of the orchestration core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeskpilotConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
}

impl DeskpilotConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DeskpilotConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Task queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of tasks in flight at once. Values below 1 are clamped.
    pub max_concurrent: usize,
    /// Number of terminal tasks retained in history (oldest evicted first).
    pub history_limit: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 1,
            history_limit: 1000,
        }
    }
}

/// Workflow engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Number of finished executions retained in history.
    pub history_limit: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self { history_limit: 100 }
    }
}

/// Action executor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Approve every confirmation request without prompting.
    pub auto_approve: bool,
    /// How long a prompt waits for an answer before it counts as aborted.
    pub confirmation_timeout_seconds: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            auto_approve: false,
            confirmation_timeout_seconds: 300,
        }
    }
}
