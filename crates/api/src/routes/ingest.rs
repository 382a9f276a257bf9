//! Ingestion Route

use axum::{body::Bytes, extract::rejection::BytesRejection, extract::State, Json};
use data_validator::validate_body;
use metrics::counter;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{error::ApiError, AppState};

/// Acknowledgement for an accepted reading
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub status: &'static str,
}

/// Validate and store one reading.
///
/// The body is read raw so that malformed JSON, and bodies the extractor
/// refuses (over the size limit), are reported through the same error shape
/// as any other bad payload.
pub async fn receive_reading(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<IngestResponse>, ApiError> {
    let body = body.map_err(|e| {
        warn!("Unreadable request body: {}", e);
        counter!("readings_rejected_total", "reason" => "unreadable_body").increment(1);
        e
    })?;

    let reading = validate_body(&body).map_err(|e| {
        warn!("Data validation error: {}", e);
        counter!("readings_rejected_total", "reason" => e.kind()).increment(1);
        e
    })?;

    state
        .store
        .append(reading.temperature, reading.humidity, reading.pressure)
        .await
        .map_err(|e| {
            counter!("storage_failures_total", "operation" => "append").increment(1);
            e
        })?;

    info!(
        "Received and stored: Temp={}°C, Humidity={}%, Pressure={}hPa",
        reading.temperature, reading.humidity, reading.pressure
    );
    counter!("readings_ingested_total").increment(1);

    Ok(Json(IngestResponse { status: "success" }))
}
