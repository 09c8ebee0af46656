//! Multi-city forecast aggregation.
//!
//! Each city fetch runs as its own task on the shared runtime. The tasks are
//! held in a `JoinSet` owned by the aggregator, and only the owner applies
//! their results, so the series map needs no locking. A task that never
//! produces a result (it panicked, or its runtime shut down) still completes
//! the join and is recorded as a transport failure for its city.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::{self, JoinError, JoinSet};

use crate::provider::ForecastProvider;
use crate::types::{City, CitySummary, FetchState, ForecastError, TemperatureSample};

/// Result of one fetch task, applied by the aggregator owner
#[derive(Debug)]
pub enum AggregatorUpdate {
    /// Result of fetching one city's series
    FetchDone {
        city: String,
        result: Result<Vec<TemperatureSample>, ForecastError>,
    },
}

/// Per-city outcome of an awaited fetch cycle, in completion order
#[derive(Debug, Default)]
pub struct CycleReport {
    /// City name and number of samples stored
    pub succeeded: Vec<(String, usize)>,
    pub failed: Vec<(String, ForecastError)>,
}

impl CycleReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, city: String, outcome: Result<usize, ForecastError>) {
        match outcome {
            Ok(count) => self.succeeded.push((city, count)),
            Err(e) => self.failed.push((city, e)),
        }
    }
}

pub struct WeatherAggregator {
    provider: Arc<ForecastProvider>,
    runtime: Handle,
    series: HashMap<String, Vec<TemperatureSample>>,
    state: FetchState,
    city_errors: HashMap<String, String>,
    in_flight: HashSet<String>,
    /// Outstanding fetches; dropping the aggregator aborts them
    tasks: JoinSet<AggregatorUpdate>,
    task_cities: HashMap<task::Id, String>,
}

impl WeatherAggregator {
    pub fn new(provider: Arc<ForecastProvider>, runtime: Handle) -> Self {
        Self {
            provider,
            runtime,
            series: HashMap::new(),
            state: FetchState::default(),
            city_errors: HashMap::new(),
            in_flight: HashSet::new(),
            tasks: JoinSet::new(),
            task_cities: HashMap::new(),
        }
    }

    /// Start fetching one city without waiting for it.
    ///
    /// Returns false when a fetch for the same city is still outstanding;
    /// no second request is issued in that case.
    pub fn fetch_one(&mut self, city: &City) -> bool {
        if !self.in_flight.insert(city.name.clone()) {
            tracing::debug!("Fetch for {} already in flight, skipping", city.name);
            return false;
        }
        self.state.is_loading = true;

        let provider = self.provider.clone();
        let name = city.name.clone();
        let city = city.clone();
        tracing::debug!("Fetching forecast for {}", city.name);

        let handle = self.tasks.spawn_on(
            async move {
                let result = provider.fetch_daily_max(&city).await;
                AggregatorUpdate::FetchDone {
                    city: city.name,
                    result,
                }
            },
            &self.runtime,
        );
        self.task_cities.insert(handle.id(), name);

        true
    }

    /// Start a fetch cycle over `cities`. Returns the number of fetches issued.
    pub fn fetch_all(&mut self, cities: &[City]) -> usize {
        self.state.is_loading = true;
        self.state.last_error = None;

        let issued = cities.iter().filter(|city| self.fetch_one(city)).count();
        self.state.is_loading = !self.in_flight.is_empty();

        tracing::info!("Fetch cycle started: {} of {} cities issued", issued, cities.len());
        issued
    }

    /// Apply one completed fetch.
    ///
    /// A failure leaves the city's stored series untouched. The shared
    /// `last_error` always reflects the most recently applied completion.
    pub fn apply(&mut self, update: AggregatorUpdate) {
        let _ = self.apply_update(update);
    }

    fn apply_update(&mut self, update: AggregatorUpdate) -> (String, Result<usize, ForecastError>) {
        let AggregatorUpdate::FetchDone { city, result } = update;

        self.in_flight.remove(&city);
        self.state.is_loading = !self.in_flight.is_empty();

        let outcome = match result {
            Ok(samples) => {
                let count = samples.len();
                tracing::info!("Stored {} samples for {}", count, city);
                self.series.insert(city.clone(), samples);
                self.city_errors.remove(&city);
                self.state.last_error = None;
                Ok(count)
            }
            Err(e) => {
                tracing::warn!("Forecast fetch for {} failed: {}", city, e);
                let message = e.to_string();
                self.city_errors.insert(city.clone(), message.clone());
                self.state.last_error = Some(message);
                Err(e)
            }
        };

        (city, outcome)
    }

    /// Turn a joined task into the update for its city.
    fn resolve(
        &mut self,
        joined: Result<(task::Id, AggregatorUpdate), JoinError>,
    ) -> Option<AggregatorUpdate> {
        match joined {
            Ok((id, update)) => {
                self.task_cities.remove(&id);
                Some(update)
            }
            Err(e) => {
                let city = self.task_cities.remove(&e.id())?;
                tracing::error!("Fetch task for {} ended without a result: {}", city, e);
                Some(AggregatorUpdate::FetchDone {
                    city,
                    result: Err(ForecastError::Transport(format!(
                        "fetch task ended without a result: {}",
                        e
                    ))),
                })
            }
        }
    }

    /// Apply every fetch that has finished without blocking. Returns how many were applied.
    pub fn poll_updates(&mut self) -> usize {
        let mut applied = 0;
        while let Some(joined) = self.tasks.try_join_next_with_id() {
            if let Some(update) = self.resolve(joined) {
                self.apply(update);
                applied += 1;
            }
        }
        applied
    }

    /// Wait for every outstanding fetch and apply each in completion order.
    pub async fn settle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        while let Some(joined) = self.tasks.join_next_with_id().await {
            if let Some(update) = self.resolve(joined) {
                let (city, outcome) = self.apply_update(update);
                report.record(city, outcome);
            }
        }

        report
    }


    /// Run a full fetch cycle and wait for it to finish.
    pub async fn refresh(&mut self, cities: &[City]) -> CycleReport {
        self.fetch_all(cities);
        let report = self.settle().await;
        tracing::info!(
            "Fetch cycle finished: {} succeeded, {} failed",
            report.succeeded.len(),
            report.failed.len()
        );
        report
    }

    /// Arithmetic mean of the stored samples, or `None` before any data exists.
    pub fn average_temperature(&self, city: &str) -> Option<f64> {
        let samples = self.series.get(city)?;
        if samples.is_empty() {
            return None;
        }
        let total: f64 = samples.iter().map(|s| s.temperature).sum();
        Some(total / samples.len() as f64)
    }

    pub fn latest_temperature(&self, city: &str) -> Option<f64> {
        self.series.get(city)?.last().map(|s| s.temperature)
    }

    /// The last `n` samples for a city, fewer if the series is shorter.
    pub fn recent_samples(&self, city: &str, n: usize) -> &[TemperatureSample] {
        match self.series.get(city) {
            Some(samples) => &samples[samples.len().saturating_sub(n)..],
            None => &[],
        }
    }

    /// Summaries for the cities that have data, in the given order.
    pub fn summaries(&self, cities: &[City]) -> Vec<CitySummary> {
        cities
            .iter()
            .filter_map(|city| {
                let average = self.average_temperature(&city.name)?;
                Some(CitySummary {
                    name: city.name.clone(),
                    average,
                    latest: self.latest_temperature(&city.name),
                    sample_count: self.series.get(&city.name).map_or(0, Vec::len),
                })
            })
            .collect()
    }

    pub fn series(&self, city: &str) -> Option<&[TemperatureSample]> {
        self.series.get(city).map(Vec::as_slice)
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.state.last_error.as_deref()
    }

    /// Most recent failure for one city, cleared by its next success
    pub fn city_error(&self, city: &str) -> Option<&str> {
        self.city_errors.get(city).map(String::as_str)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}
