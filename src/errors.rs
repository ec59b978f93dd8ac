use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading config file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse JSON configuration in {path}: {source}")]
    JsonParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Configuration file not found at {path}")]
    NotFound { path: PathBuf },
    #[error("Invalid configuration value for '{field}': {message}")]
    Invalid { field: String, message: String },
}

/// Failures of the line source. Any of these ends the current cycle.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Failed to open serial device {device}: {source}")]
    Open {
        device: String,
        #[source]
        source: serialport::Error,
    },
    #[error("Serial read failed: {0}")]
    Io(#[from] io::Error),
    #[error("Serial device closed the stream")]
    Disconnected,
    #[error("Line source used before being opened")]
    NotOpen,
    #[error("Device appears stalled: {count} consecutive malformed lines")]
    StalledDevice { count: usize },
}

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Failed to connect to database: {0}")]
    Connect(#[source] postgres::Error),
    #[error("Database operation failed: {0}")]
    Query(#[source] postgres::Error),
    #[error("Failed to encode record: {0}")]
    Serialization(#[from] serde_json::Error),
}

// --- Validation Error Enum ---

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required fields: {codes:?}")]
    MissingRequired { codes: Vec<&'static str> },
}

/// Errors that end the whole monitor process.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Configuration loading failed: {0}")]
    Config(#[from] ConfigError),
    #[error("Database connection failed: {0}")]
    DbConnection(#[source] postgres::Error),
    #[error("Database schema creation failed: {0}")]
    SchemaSetup(#[source] postgres::Error),
    #[error("Giving up after {attempts} consecutive read failures, last: {last}")]
    ReadFailures { attempts: u32, last: ReadError },
}

impl MonitorError {
    /// Process exit code reported by the binary.
    pub fn exit_code(&self) -> i32 {
        match self {
            MonitorError::Config(ConfigError::JsonParseError { .. })
            | MonitorError::Config(ConfigError::Invalid { .. }) => 3,
            MonitorError::Config(_) => 1,
            MonitorError::SchemaSetup(_) => 4,
            MonitorError::DbConnection(_) => 5,
            MonitorError::ReadFailures { .. } => 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_failure_class() {
        let not_found = MonitorError::Config(ConfigError::NotFound {
            path: PathBuf::from("config.json"),
        });
        assert_eq!(not_found.exit_code(), 1);

        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let malformed = MonitorError::Config(ConfigError::JsonParseError {
            path: PathBuf::from("config.json"),
            source: parse_err,
        });
        assert_eq!(malformed.exit_code(), 3);

        let stalled = MonitorError::ReadFailures {
            attempts: 5,
            last: ReadError::Disconnected,
        };
        assert_eq!(stalled.exit_code(), 6);
    }

    #[test]
    fn validation_error_lists_codes() {
        let err = ValidationError::MissingRequired {
            codes: vec!["IMAX", "PAPP"],
        };
        assert_eq!(err.to_string(), "Missing required fields: [\"IMAX\", \"PAPP\"]");
    }
}
