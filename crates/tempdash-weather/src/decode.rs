//! Decoding of Open-Meteo daily forecast bodies into temperature series.

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;

use crate::types::{ForecastError, TemperatureSample};

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    daily: DailyData,
}

#[derive(Debug, Deserialize)]
struct DailyData {
    time: Vec<String>,
    /// Open-Meteo reports missing model values as null
    temperature_2m_max: Vec<Option<f64>>,
}

/// Open-Meteo error body, sent alongside a 4xx status
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub reason: String,
}

/// Decode a forecast body into an ordered series of daily maxima.
///
/// The `time` and `temperature_2m_max` arrays are zipped by index. Entries
/// whose date does not parse, or whose temperature is null, are dropped.
/// Arrays of different length are rejected.
pub fn decode_daily_max(body: &[u8]) -> Result<Vec<TemperatureSample>, ForecastError> {
    let response: ForecastResponse =
        serde_json::from_slice(body).map_err(|e| ForecastError::Decode(e.to_string()))?;
    let DailyData {
        time,
        temperature_2m_max,
    } = response.daily;

    if time.len() != temperature_2m_max.len() {
        return Err(ForecastError::Decode(format!(
            "daily arrays differ in length ({} dates, {} temperatures)",
            time.len(),
            temperature_2m_max.len()
        )));
    }

    let samples: Vec<TemperatureSample> = time
        .iter()
        .zip(temperature_2m_max)
        .filter_map(|(raw, temperature)| {
            let Some(date) = parse_date(raw) else {
                tracing::trace!("Dropping sample with unparsable date {:?}", raw);
                return None;
            };
            let Some(temperature) = temperature else {
                tracing::trace!("Dropping sample for {} with no temperature", date);
                return None;
            };
            Some(TemperatureSample { date, temperature })
        })
        .collect();

    if samples.len() < time.len() {
        tracing::debug!(
            "Dropped {} of {} forecast samples",
            time.len() - samples.len(),
            time.len()
        );
    }

    Ok(samples)
}

/// Parse an ISO-8601 date-time with offset or a plain calendar date.
///
/// Date-times keep the calendar date as written, not converted to UTC.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    // chrono accepts unpadded fields; the extended format is exactly 10 chars
    if raw.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}
