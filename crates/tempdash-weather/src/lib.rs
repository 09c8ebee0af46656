//! Multi-city temperature forecasts for Tempdash
//!
//! Fetches daily maximum temperatures from the Open-Meteo API for a set of
//! configured cities and aggregates them into per-city series.

pub mod aggregator;
pub mod decode;
pub mod provider;
pub mod types;

pub use aggregator::{AggregatorUpdate, CycleReport, WeatherAggregator};
pub use decode::decode_daily_max;
pub use provider::ForecastProvider;
pub use types::*;
