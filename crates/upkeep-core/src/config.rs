//! Upkeep configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, UpkeepError};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpkeepConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

impl UpkeepConfig {
    /// Load config from the default path (~/.upkeep/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| UpkeepError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| UpkeepError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| UpkeepError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Upkeep home directory (~/.upkeep).
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".upkeep")
    }
}

/// Where the work order database lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    /// Separate database for the notification audit trail.
    #[serde(default = "default_notification_db_path")]
    pub notification_log_path: PathBuf,
}

fn default_db_path() -> PathBuf {
    UpkeepConfig::home_dir().join("upkeep.db")
}
fn default_notification_db_path() -> PathBuf {
    UpkeepConfig::home_dir().join("notifications.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            notification_log_path: default_notification_db_path(),
        }
    }
}

/// Background scheduler cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between scheduler cycles. Enforced minimum: 60.
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    /// Shortened sleep after a failed cycle.
    #[serde(default = "default_error_cooldown")]
    pub error_cooldown_secs: u64,
    /// How many days before the due date the "upcoming" reminder fires.
    #[serde(default = "default_upcoming_days")]
    pub upcoming_days: u32,
}

fn default_check_interval() -> u64 {
    3600
}
fn default_error_cooldown() -> u64 {
    60
}
fn default_upcoming_days() -> u32 {
    1
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval(),
            error_cooldown_secs: default_error_cooldown(),
            upcoming_days: default_upcoming_days(),
        }
    }
}

/// SMTP settings for outgoing notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Falls back to `username` when empty.
    #[serde(default)]
    pub from_address: String,
    #[serde(default = "default_display_name")]
    pub display_name: String,
}

fn default_smtp_port() -> u16 {
    587
}
fn default_display_name() -> String {
    "Upkeep CMMS".into()
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            from_address: String::new(),
            display_name: default_display_name(),
        }
    }
}

impl EmailConfig {
    /// Whether enough is configured to actually send mail.
    pub fn is_configured(&self) -> bool {
        self.enabled
            && !self.smtp_host.is_empty()
            && !self.username.is_empty()
            && !self.password.is_empty()
    }

    /// Sender address, falling back to the SMTP username.
    pub fn effective_from(&self) -> &str {
        if self.from_address.is_empty() {
            &self.username
        } else {
            &self.from_address
        }
    }
}
