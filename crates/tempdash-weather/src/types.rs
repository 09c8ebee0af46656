use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily metric requested from the forecast API
pub const DAILY_METRIC: &str = "temperature_2m_max";

/// Forecast location, keyed by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// IANA timezone, e.g. "Europe/London"
    pub timezone: String,
}

impl City {
    pub fn new(
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
        timezone: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
            timezone: timezone.into(),
        }
    }
}

/// One day's maximum temperature in °C
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureSample {
    pub date: NaiveDate,
    pub temperature: f64,
}

/// Loading/error flags shared by every city of an aggregator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchState {
    pub is_loading: bool,
    pub last_error: Option<String>,
}

/// Derived figures for one city, in the shape the dashboard renders
#[derive(Debug, Clone, PartialEq)]
pub struct CitySummary {
    pub name: String,
    pub average: f64,
    pub latest: Option<f64>,
    pub sample_count: usize,
}

/// Forecast fetch errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForecastError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// Message is the transport's own description
    #[error("{0}")]
    Transport(String),
    #[error("Forecast API returned {status}: {reason}")]
    Api { status: u16, reason: String },
    #[error("No data received")]
    EmptyResponse,
    #[error("Failed to decode data: {0}")]
    Decode(String),
}

impl ForecastError {
    /// Whether a later fetch cycle may succeed without a config change
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::EmptyResponse => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            Self::InvalidUrl(_) | Self::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for ForecastError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}
