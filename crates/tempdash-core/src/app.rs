use anyhow::Result;
use std::sync::Arc;
use tempdash_weather::{City, ForecastProvider, WeatherAggregator};
use tokio::runtime::Handle;

use crate::error::{AppError, WeatherError};
use crate::Config;

/// Main application state: validated config plus the shared forecast provider
pub struct App {
    config: Arc<Config>,
    provider: Arc<ForecastProvider>,
}

impl App {
    /// Create a new application instance from the on-disk config
    pub fn new() -> Result<Self> {
        let (config, _warnings) = Config::load_validated()?;
        Ok(Self::with_config(config)?)
    }

    /// Create an application instance from an already-loaded config
    pub fn with_config(config: Config) -> Result<Self, AppError> {
        let provider = ForecastProvider::with_options(
            &config.forecast.base_url,
            &config.forecast.user_agent,
        )?;

        tracing::info!(
            "Application configured with {} cities against {}",
            config.cities.len(),
            provider.base_url()
        );

        Ok(Self {
            config: Arc::new(config),
            provider: Arc::new(provider),
        })
    }

    /// Build the dashboard's aggregator on the given runtime
    pub fn aggregator(&self, runtime: Handle) -> WeatherAggregator {
        WeatherAggregator::new(self.provider.clone(), runtime)
    }

    /// Resolve city names against the config. An empty selection means every city.
    pub fn select_cities(&self, names: &[String]) -> Result<Vec<City>, AppError> {
        if names.is_empty() {
            return Ok(self.config.cities.clone());
        }

        names
            .iter()
            .map(|name| {
                self.config
                    .city(name)
                    .cloned()
                    .ok_or_else(|| WeatherError::UnknownCity(name.clone()).into())
            })
            .collect()
    }

    /// Get reference to application config
    pub fn config(&self) -> &Config {
        &self.config
    }
}
