// src/db.rs
use crate::data_models::{LinkyMetrics, KNOWN_CODES};
use crate::errors::{MonitorError, PersistError};
use crate::retry::{retry_with_backoff, RetryConfig};
use chrono::Utc;
use log::{debug, info};
use postgres::types::ToSql;
use postgres::{Client, NoTls};

/// Schema applied when the `stream` table is missing.
pub const SCHEMA_SQL: &str = include_str!("../sql/schema.sql");

const REQUIRED_TABLES: [&str; 1] = ["stream"];

/// Destination for completed, validated frames.
pub trait Sink {
    /// Store one record. An error means nothing can be assumed stored.
    fn persist(&mut self, record: &LinkyMetrics) -> Result<(), PersistError>;

    /// Sink type for logging
    fn sink_type(&self) -> &'static str;
}

/// Writes each frame to PostgreSQL, opening a fresh connection per write.
pub struct PostgresSink {
    config: postgres::Config,
    insert_sql: String,
}

impl PostgresSink {
    pub fn new(config: postgres::Config) -> Self {
        Self {
            config,
            insert_sql: insert_statement(),
        }
    }
}

impl Sink for PostgresSink {
    fn persist(&mut self, record: &LinkyMetrics) -> Result<(), PersistError> {
        let known: Vec<Option<&str>> = record
            .known_fields()
            .into_iter()
            .map(|(_, value)| value)
            .collect();
        let extra = serde_json::to_value(&record.extra)?;
        let recorded_at = Utc::now();

        let mut params: Vec<&(dyn ToSql + Sync)> = known
            .iter()
            .map(|value| value as &(dyn ToSql + Sync))
            .collect();
        params.push(&extra);
        params.push(&recorded_at);

        let mut client = self.config.connect(NoTls).map_err(PersistError::Connect)?;
        debug!("Inserting stream record");
        client
            .execute(self.insert_sql.as_str(), &params)
            .map_err(PersistError::Query)?;
        client.close().map_err(PersistError::Query)
    }

    fn sink_type(&self) -> &'static str {
        "PostgreSQL"
    }
}

/// Dry-run sink: logs the frame as JSON instead of storing it.
#[derive(Debug, Default)]
pub struct LogSink {
    written: u64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

impl Sink for LogSink {
    fn persist(&mut self, record: &LinkyMetrics) -> Result<(), PersistError> {
        let json = serde_json::to_string(record)?;
        info!("Frame: {}", json);
        self.written += 1;
        Ok(())
    }

    fn sink_type(&self) -> &'static str {
        "log"
    }
}

/// `INSERT INTO stream (<known codes>, extra, recorded_at) VALUES ($1, ...)`.
pub fn insert_statement() -> String {
    let mut columns: Vec<String> = KNOWN_CODES.iter().map(|c| c.to_ascii_lowercase()).collect();
    columns.push("extra".to_string());
    columns.push("recorded_at".to_string());
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}", i)).collect();
    format!(
        "INSERT INTO stream ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    )
}

/// Connects with exponential backoff; used once at start-up.
pub fn connect_with_retry(
    config: &postgres::Config,
    retry: &RetryConfig,
) -> Result<Client, MonitorError> {
    retry_with_backoff(retry, "database_connect", || config.connect(NoTls))
        .map_err(MonitorError::DbConnection)
}

/// Creates the schema when a required table is missing. Returns true when it
/// had to be created.
pub fn ensure_schema(client: &mut Client) -> Result<bool, MonitorError> {
    let tables: Vec<&str> = REQUIRED_TABLES.to_vec();
    let row = client
        .query_one(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name = ANY($1)",
            &[&tables],
        )
        .map_err(MonitorError::DbConnection)?;
    let count: i64 = row.get(0);

    if count as usize == REQUIRED_TABLES.len() {
        debug!("Database schema present");
        return Ok(false);
    }

    info!("Database schema is not there, creating it...");
    client
        .batch_execute(SCHEMA_SQL)
        .map_err(MonitorError::SchemaSetup)?;
    info!("Database schema created successfully");
    Ok(true)
}

/// Start-up check: connect (with retries), create the schema if needed, close.
pub fn verify_connection(
    config: &postgres::Config,
    retry: &RetryConfig,
) -> Result<(), MonitorError> {
    let mut client = connect_with_retry(config, retry)?;
    ensure_schema(&mut client)?;
    client.close().map_err(MonitorError::DbConnection)
}
