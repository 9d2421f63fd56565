//! Match stats - offline telemetry processor
//!
//! Reads a JSON-lines event stream, rebuilds the round lifecycle and writes
//! per-round and per-match statistics.

use std::fs::File;
use std::io::{BufRead, BufReader};

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use matchstats::util::time::Timer;
use matchstats::{Config, JsonFileSink, Pipeline, TimedEvent};

fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env(std::env::args().nth(1))?;

    init_tracing(&config.log_level, config.log_json);

    info!("Starting match stats");
    info!("Events: {}", config.events_path.display());

    let mut timer = Timer::new();
    let sink = JsonFileSink::new(&config.output_path);
    let mut pipeline = Pipeline::new(config.settings(), sink)?;

    let file = File::open(&config.events_path)
        .with_context(|| format!("Failed to open {}", config.events_path.display()))?;
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line_no = idx + 1;
        let line = line.with_context(|| format!("Failed to read line {line_no}"))?;
        if line.trim().is_empty() {
            continue;
        }
        let event: TimedEvent = serde_json::from_str(&line)
            .with_context(|| format!("Malformed event on line {line_no}"))?;
        pipeline.process(&event)?;
    }
    info!(
        events = pipeline.summary().events,
        elapsed_ms = timer.elapsed_ms(),
        "Stream consumed"
    );

    timer.reset();
    let (summary, sink) = pipeline.finish()?;
    info!(
        events = summary.events,
        rounds = summary.rounds_written,
        sink_failures = summary.sink_failures,
        elapsed_ms = timer.elapsed_ms(),
        "Processing complete"
    );
    info!("Match report: {}", sink.match_path().display());
    info!("Round reports: {}", sink.rounds_path().display());
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}
