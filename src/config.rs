use crate::errors::ConfigError;
use crate::logging::{Rotation, DEFAULT_LOG_BACKUP_COUNT, DEFAULT_LOG_MAX_BYTES};
use crate::serial::port::DEFAULT_BAUD_RATE;
use serde::Deserialize;
use std::env;
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Database connection settings. `url` (or `DATABASE_URL`) wins over the
/// individual fields when present.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            user: "linky".to_string(),
            password: None,
            name: "linky".to_string(),
        }
    }
}

impl DatabaseConfig {
    pub fn to_pg_config(&self) -> Result<postgres::Config, ConfigError> {
        if let Some(url) = &self.url {
            return url.parse::<postgres::Config>().map_err(|e| ConfigError::Invalid {
                field: "database.url".to_string(),
                message: e.to_string(),
            });
        }
        let mut pg = postgres::Config::new();
        pg.host(&self.host)
            .port(self.port)
            .user(&self.user)
            .dbname(&self.name);
        if let Some(password) = &self.password {
            pg.password(password);
        }
        Ok(pg)
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Serial device of the TIC adapter, e.g. "/dev/ttyS0".
    pub device: String,
    pub baud_rate: u32,
    pub database: DatabaseConfig,
    pub poll_interval_secs: u64,
    /// 0 disables the stalled-device guard.
    pub max_consecutive_invalid_lines: usize,
    /// 0 means never give up.
    pub max_consecutive_read_failures: u32,
    pub log_file: Option<PathBuf>,
    /// Size at which `log_file` rolls over; 0 disables rotation.
    pub log_max_bytes: u64,
    /// Rotated files kept next to `log_file`; 0 disables rotation.
    pub log_backup_count: u32,
    pub log_level: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyS0".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            database: DatabaseConfig::default(),
            poll_interval_secs: 60,
            max_consecutive_invalid_lines: 64,
            max_consecutive_read_failures: 5,
            log_file: None,
            log_max_bytes: DEFAULT_LOG_MAX_BYTES,
            log_backup_count: DEFAULT_LOG_BACKUP_COUNT,
            log_level: "info".to_string(),
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn log_rotation(&self) -> Rotation {
        Rotation {
            max_bytes: self.log_max_bytes,
            backup_count: self.log_backup_count,
        }
    }

    /// Applies `DATABASE_URL` when set.
    pub fn apply_env(&mut self) {
        if let Ok(url) = env::var("DATABASE_URL") {
            if !url.trim().is_empty() {
                self.database.url = Some(url);
            }
        }
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.device.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "device".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::Invalid {
                field: "baud_rate".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(self)
    }
}

// Function to load the configuration from the JSON file
pub fn load_config(path: &Path) -> Result<MonitorConfig, ConfigError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ConfigError::NotFound {
            path: path.to_path_buf(),
        },
        _ => ConfigError::IoError {
            path: path.to_path_buf(),
            source: e,
        },
    })?;
    let reader = BufReader::new(file);

    let config: MonitorConfig =
        serde_json::from_reader(reader).map_err(|e| ConfigError::JsonParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

    config.validate()
}
