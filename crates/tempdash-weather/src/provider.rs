//! Open-Meteo forecast client.

use std::sync::Arc;

use reqwest::Client;
use tracing::instrument;
use url::Url;

use crate::decode::{decode_daily_max, ApiErrorBody};
use crate::types::{City, ForecastError, TemperatureSample, DAILY_METRIC};

pub const OPEN_METEO_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_USER_AGENT: &str = "Tempdash/0.1.0";

#[derive(Debug, Clone)]
pub struct ForecastProvider {
    client: Arc<Client>,
    base_url: String,
}

impl ForecastProvider {
    pub fn new() -> Result<Self, ForecastError> {
        Self::with_options(OPEN_METEO_FORECAST_URL, DEFAULT_USER_AGENT)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, ForecastError> {
        Self::with_options(base_url, DEFAULT_USER_AGENT)
    }

    /// No request timeout is set: a fetch runs until the transport finishes or fails.
    pub fn with_options(base_url: &str, user_agent: &str) -> Result<Self, ForecastError> {
        let client = Client::builder().user_agent(user_agent).build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the daily-maximum request URL for a city.
    ///
    /// Query values are form-encoded, so any timezone string yields a
    /// well-formed URL. An empty timezone is sent as `timezone=`.
    pub fn forecast_url(&self, city: &City) -> Result<Url, ForecastError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ForecastError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;

        url.query_pairs_mut()
            .append_pair("latitude", &city.latitude.to_string())
            .append_pair("longitude", &city.longitude.to_string())
            .append_pair("daily", DAILY_METRIC)
            .append_pair("timezone", &city.timezone);

        Ok(url)
    }

    /// Fetch the daily maximum temperature series for one city.
    #[instrument(skip(self, city), fields(city = %city.name), level = "debug")]
    pub async fn fetch_daily_max(
        &self,
        city: &City,
    ) -> Result<Vec<TemperatureSample>, ForecastError> {
        let url = self.forecast_url(city)?;
        tracing::debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let reason = serde_json::from_slice::<ApiErrorBody>(&body)
                .map(|b| b.reason)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string()
                });
            return Err(ForecastError::Api {
                status: status.as_u16(),
                reason,
            });
        }

        if body.is_empty() {
            return Err(ForecastError::EmptyResponse);
        }

        decode_daily_max(&body)
    }
}
