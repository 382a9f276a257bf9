//! Storage Layer
//!
//! Append-only SQLite persistence for sensor readings.

mod repository;

pub use repository::{ReadingStore, SensorReading, StoreOptions};
pub use sqlx::Error as SqlxError;

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backing file could not be opened or the schema could not be created.
    #[error("Store initialization failed: {0}")]
    Init(#[source] sqlx::Error),
    /// A reading could not be appended.
    #[error("Write failed: {0}")]
    Write(#[source] sqlx::Error),
    /// Recent readings could not be queried.
    #[error("Query failed: {0}")]
    Query(#[source] sqlx::Error),
}
