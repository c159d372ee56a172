//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from an optional TOML file. A missing or
//! malformed file never stops startup: a warning is logged and built-in
//! defaults are used instead.
//!
//! Root folder priority order:
//! 1. Command-line argument
//! 2. `VMT_ROOT_FOLDER` environment variable
//! 3. `root_folder` in the TOML config file
//! 4. OS-dependent default

use crate::mpg::MpgOptions;
use crate::reminders::Thresholds;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "VMT_ROOT_FOLDER";

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "VMT_CONFIG";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "vmt.db";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Folder holding the database and mail outbox
    pub root_folder: Option<PathBuf>,
    pub bind_address: String,
    pub port: u16,
    /// Owner id used for account scoping (single-tenant)
    pub owner: String,
    pub logging: LoggingConfig,
    pub reminders: ReminderConfig,
    pub mail: MailConfig,
    pub notify: NotifyConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            bind_address: "127.0.0.1".to_string(),
            port: 5780,
            owner: "owner".to_string(),
            logging: LoggingConfig::default(),
            reminders: ReminderConfig::default(),
            mail: MailConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), overridden by RUST_LOG
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Reminder and fuel economy thresholds
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// Oil change interval in miles when a record does not carry its own
    pub oil_change_interval: i64,
    pub oil_soon_miles: i64,
    pub oil_soon_days: i64,
    pub oil_due_miles: i64,
    pub oil_due_days: i64,
    /// Calendar limit between oil changes, in months
    pub oil_change_months: u32,
    /// Mileage difference between fill-ups above which a fill is considered missing
    pub mpg_gap_threshold: i64,
    /// Number of fill-ups in the recent MPG window
    pub mpg_recent_window: usize,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            oil_change_interval: 5000,
            oil_soon_miles: 500,
            oil_soon_days: 30,
            oil_due_miles: 50,
            oil_due_days: 5,
            oil_change_months: 6,
            mpg_gap_threshold: 500,
            mpg_recent_window: 5,
        }
    }
}

impl ReminderConfig {
    pub fn oil_thresholds(&self) -> Thresholds {
        Thresholds {
            soon_miles: self.oil_soon_miles,
            soon_days: self.oil_soon_days,
            due_miles: self.oil_due_miles,
            due_days: self.oil_due_days,
        }
    }

    pub fn mpg_options(&self) -> MpgOptions {
        MpgOptions {
            gap_threshold: self.mpg_gap_threshold,
            recent_window: self.mpg_recent_window,
        }
    }
}

/// How composed emails leave the process
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MailTransport {
    /// Log the message through tracing
    Log,
    /// Write one `.eml` file per message to the outbox directory
    Outbox,
}

/// Reminder email settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MailConfig {
    pub sender: Option<String>,
    /// Base URL used for links inside reminder emails
    pub app_url: String,
    /// Outbox directory, `<root>/outbox` when unset
    pub outbox_dir: Option<PathBuf>,
    pub transport: MailTransport,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            sender: None,
            app_url: "http://127.0.0.1:5780".to_string(),
            outbox_dir: None,
            transport: MailTransport::Outbox,
        }
    }
}

/// Reminder dispatcher settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub interval_minutes: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self { interval_minutes: 60 }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load configuration, falling back to defaults on any problem
    ///
    /// Path priority: explicit argument, `VMT_CONFIG`, platform config dir.
    pub fn load(path: Option<&Path>) -> Self {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => std::env::var(CONFIG_PATH_ENV)
                .ok()
                .map(PathBuf::from)
                .or_else(default_config_path),
        };

        let Some(path) = path else {
            warn!("Could not determine config directory, using built-in defaults");
            return Self::default();
        };

        if !path.exists() {
            info!("Config file {} not found, using built-in defaults", path.display());
            return Self::default();
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read config file {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match Self::from_toml_str(&content) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Invalid config file {}: {} (using defaults)", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Platform config file location (`~/.config/vmt/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("vmt").join("config.toml"))
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("vmt"))
        .unwrap_or_else(|| PathBuf::from("./vmt_data"))
}

/// Resolves the root folder from CLI, environment, config file and OS default
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    config_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>, config: &TomlConfig) -> Self {
        Self {
            cli_arg,
            config_root: config.root_folder.clone(),
        }
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.config_root {
            return path.clone();
        }

        default_root_folder()
    }
}

/// Creates the root folder and derives paths inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }

    pub fn outbox_path(&self, mail: &MailConfig) -> PathBuf {
        mail.outbox_dir
            .clone()
            .unwrap_or_else(|| self.root_folder.join("outbox"))
    }
}
