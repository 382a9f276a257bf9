//! Reading Store Implementation

use crate::StorageError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sensor_readings (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    temperature REAL NOT NULL,
    humidity    REAL NOT NULL,
    pressure    REAL NOT NULL,
    timestamp   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
)"#;

const CREATE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_sensor_readings_timestamp ON sensor_readings (timestamp, id)";

/// One persisted sensor reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SensorReading {
    pub id: i64,
    /// Degrees Celsius
    pub temperature: f64,
    /// Relative humidity percentage
    pub humidity: f64,
    /// Hectopascal
    pub pressure: f64,
    /// Assigned by the database clock at insert time
    pub timestamp: DateTime<Utc>,
}

/// Options for opening a file-backed store
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Database file location
    pub path: PathBuf,
    /// Upper bound on pooled connections
    pub max_connections: u32,
    /// How long a statement waits on a locked database before failing
    pub busy_timeout: Duration,
    /// Open without write access
    pub read_only: bool,
}

impl StoreOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
            read_only: false,
        }
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

/// Append-only store of sensor readings.
///
/// Cloning is cheap: clones share one connection pool. Every operation
/// checks a connection out of the pool and returns it when the query
/// future completes or is dropped.
#[derive(Debug, Clone)]
pub struct ReadingStore {
    pool: SqlitePool,
}

impl ReadingStore {
    /// Open (creating if missing) the database file described by `options`.
    ///
    /// This connects but does not create the schema; call
    /// [`ReadingStore::initialize`] before serving traffic.
    pub async fn open(options: &StoreOptions) -> Result<Self, StorageError> {
        let mut connect = SqliteConnectOptions::new()
            .filename(&options.path)
            .busy_timeout(options.busy_timeout)
            .read_only(options.read_only);

        if !options.read_only {
            connect = connect
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal);
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.busy_timeout)
            .connect_with(connect)
            .await
            .map_err(|e| {
                error!(path = %options.path.display(), "Failed to open reading store: {}", e);
                StorageError::Init(e)
            })?;

        info!(path = %options.path.display(), "Opened reading store");
        Ok(Self { pool })
    }

    /// Open a private in-memory store.
    ///
    /// The pool holds exactly one connection that never expires, since an
    /// in-memory database lives only as long as its connection.
    pub async fn in_memory() -> Result<Self, StorageError> {
        let connect: SqliteConnectOptions = "sqlite::memory:".parse().map_err(StorageError::Init)?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect)
            .await
            .map_err(StorageError::Init)?;

        debug!("Opened in-memory reading store");
        Ok(Self { pool })
    }

    /// Ensure the readings table and its ordering index exist.
    ///
    /// Safe to call any number of times.
    pub async fn initialize(&self) -> Result<(), StorageError> {
        for statement in [CREATE_TABLE, CREATE_INDEX] {
            sqlx::query(statement).execute(&self.pool).await.map_err(|e| {
                error!("Schema initialization failed: {}", e);
                StorageError::Init(e)
            })?;
        }

        info!("Reading store initialized");
        Ok(())
    }

    /// Append one reading, returning its assigned id.
    pub async fn append(
        &self,
        temperature: f64,
        humidity: f64,
        pressure: f64,
    ) -> Result<i64, StorageError> {
        let result = sqlx::query(
            "INSERT INTO sensor_readings (temperature, humidity, pressure) VALUES (?, ?, ?)",
        )
        .bind(temperature)
        .bind(humidity)
        .bind(pressure)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Error inserting reading: {}", e);
            StorageError::Write(e)
        })?;

        let id = result.last_insert_rowid();
        debug!("Inserted reading with ID {}", id);
        Ok(id)
    }

    /// Up to `limit` most recent readings, newest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<SensorReading>, StorageError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        sqlx::query_as::<_, SensorReading>(
            "SELECT id, temperature, humidity, pressure, timestamp \
             FROM sensor_readings \
             ORDER BY timestamp DESC, id DESC \
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Error querying recent readings: {}", e);
            StorageError::Query(e)
        })
    }

    /// Total number of stored readings
    pub async fn count(&self) -> Result<u64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sensor_readings")
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::Query)?;

        Ok(count.max(0) as u64)
    }

    /// Wait for checked-out connections to return, then close the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Reading store closed");
    }
}
