//! HTTP Routes

pub mod dashboard;
pub mod ingest;
pub mod readings;
