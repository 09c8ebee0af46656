use std::fmt::Write as _;

use anyhow::Result;
use tempdash_core::{App, AppError};
use tempdash_weather::{City, CycleReport, WeatherAggregator};

/// Samples listed under each city, matching the dashboard's detail panel
const RECENT_DAYS: usize = 3;

#[tokio::main]
async fn main() -> Result<()> {
    tempdash_core::init()?;

    let app = App::new()?;
    let names: Vec<String> = std::env::args().skip(1).collect();
    let cities = app.select_cities(&names)?;

    tracing::info!("Tempdash started");

    let mut aggregator = app.aggregator(tokio::runtime::Handle::current());
    let report = aggregator.refresh(&cities).await;

    println!("Tempdash - Daily Maximum Temperatures");
    println!("Config directory: {}", app.config().config_dir.display());
    println!();
    print!("{}", render_dashboard(&aggregator, &cities, report));

    Ok(())
}

/// Render the text dashboard.
///
/// While the aggregator holds an error, only the error and per-city failures
/// are shown; the temperature tables are suppressed.
fn render_dashboard(aggregator: &WeatherAggregator, cities: &[City], report: CycleReport) -> String {
    let mut out = String::new();

    if let Some(err) = aggregator.last_error() {
        let _ = writeln!(out, "Error: {}", err);
        for (city, e) in report.failed {
            let transient = if e.is_transient() { " (transient)" } else { "" };
            let detail = e.to_string();
            let _ = writeln!(
                out,
                "  {}: {} [{}]{}",
                city,
                AppError::from(e).user_message(),
                detail,
                transient
            );
        }
        return out;
    }

    let summaries = aggregator.summaries(cities);
    if summaries.is_empty() {
        let _ = writeln!(out, "No temperature data available.");
        return out;
    }

    let _ = writeln!(
        out,
        "{:<16} {:>8} {:>10} {:>6}",
        "City", "Avg °C", "Latest °C", "Days"
    );
    for summary in &summaries {
        let latest = summary
            .latest
            .map(|t| format!("{:.1}", t))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:<16} {:>8.1} {:>10} {:>6}",
            summary.name, summary.average, latest, summary.sample_count
        );
        for sample in aggregator.recent_samples(&summary.name, RECENT_DAYS) {
            let _ = writeln!(out, "    {}  {:.1}°C", sample.date, sample.temperature);
        }
    }

    // Cities that failed earlier but were masked by a later success
    for city in cities {
        if let Some(err) = aggregator.city_error(&city.name) {
            let _ = writeln!(out, "{}: {}", city.name, err);
        }
    }

    out
}
