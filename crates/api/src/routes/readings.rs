//! Retrieval Route

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use std::sync::Arc;
use storage::SensorReading;

use crate::{error::ApiError, AppState};

/// Parallel, index-aligned series ordered oldest to newest
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct ReadingSeries {
    pub timestamps: Vec<DateTime<Utc>>,
    pub temperature: Vec<f64>,
    pub humidity: Vec<f64>,
    pub pressure: Vec<f64>,
}

impl ReadingSeries {
    /// Reshape rows as returned by the store (newest first).
    pub fn from_newest_first(readings: Vec<SensorReading>) -> Self {
        let mut series = Self {
            timestamps: Vec::with_capacity(readings.len()),
            temperature: Vec::with_capacity(readings.len()),
            humidity: Vec::with_capacity(readings.len()),
            pressure: Vec::with_capacity(readings.len()),
        };

        for reading in readings.into_iter().rev() {
            series.timestamps.push(reading.timestamp);
            series.temperature.push(reading.temperature);
            series.humidity.push(reading.humidity);
            series.pressure.push(reading.pressure);
        }

        series
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Most recent window of readings for plotting
pub async fn get_readings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReadingSeries>, ApiError> {
    let readings = state.store.recent(state.window).await.map_err(|e| {
        counter!("storage_failures_total", "operation" => "recent").increment(1);
        e
    })?;

    Ok(Json(ReadingSeries::from_newest_first(readings)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reading(id: i64, secs: i64) -> SensorReading {
        SensorReading {
            id,
            temperature: id as f64,
            humidity: id as f64 * 10.0,
            pressure: 1000.0 + id as f64,
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    #[test]
    fn test_reshape_reverses_once() {
        let newest_first = vec![reading(3, 30), reading(2, 20), reading(1, 10)];
        let series = ReadingSeries::from_newest_first(newest_first);

        assert_eq!(series.len(), 3);
        assert_eq!(series.temperature, vec![1.0, 2.0, 3.0]);
        assert_eq!(series.humidity, vec![10.0, 20.0, 30.0]);
        assert_eq!(series.pressure, vec![1001.0, 1002.0, 1003.0]);
        assert!(series.timestamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_reshape_empty() {
        let series = ReadingSeries::from_newest_first(Vec::new());
        assert!(series.is_empty());
        assert_eq!(series, ReadingSeries::default());
    }

    #[test]
    fn test_serialized_shape() {
        let series = ReadingSeries::from_newest_first(vec![reading(1, 0)]);
        let json = serde_json::to_value(&series).unwrap();
        assert_eq!(json["timestamps"][0], "1970-01-01T00:00:00Z");
        assert_eq!(json["temperature"][0], 1.0);
        assert_eq!(json["humidity"][0], 10.0);
        assert_eq!(json["pressure"][0], 1001.0);
    }
}
