//! Application entry point for the `soilflow` monitoring service.
//!
//! This binary orchestrates the full startup sequence for the soil moisture
//! pipeline, including:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Opening the SQLite sample store (created on first run)
//! - Creating the database schema if it does not exist
//! - Wiring the sensor source, notifier, and alert policy into the loop
//! - Running the monitoring loop on its polling cadence
//!
//! # Environment Variables
//! - `DATABASE_URL` (**required**) – SQLite connection string
//! - `ALERT_WEBHOOK_URL` (**required**) – alert delivery endpoint
//! - `ALERT_RECIPIENT` (**required**) – recipient identifier
//! - `SOIL_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `SOIL_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! This module follows the Explicit Module Boundary Pattern (EMBP) by
//! delegating schema setup to `schema`, configuration parsing to `config`,
//! and cycle orchestration to `monitor`.
use std::env;
use std::str::FromStr;

use anyhow::Result;
use is_terminal::IsTerminal;
use chrono::{Timelike, Utc};
use dotenvy::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use soilflow::alert::ClockState;
use soilflow::monitor::MonitoringLoop;
use soilflow::notify::WebhookNotifier;
use soilflow::source::SimulatedSensor;
use soilflow::store::SampleStore;
use soilflow::{config, schema};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    init_tracing();
    dotenv().ok();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    tracing::info!("Opening sample store: {}", cfg.db_url);

    let options = SqliteConnectOptions::from_str(&cfg.db_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open sample store '{}': {}", cfg.db_url, e))?;

    schema::create_schema(&pool).await?;
    tracing::info!("Sample store ready");

    let store = SampleStore::new(pool);
    let notifier = WebhookNotifier::new(cfg.webhook_url.clone(), cfg.recipient.clone());

    // Stand-in source until real acquisition hardware is wired in.
    let source = SimulatedSensor::new();

    let start_hour =
        (i64::from(Utc::now().hour()) + cfg.tz_offset_hours).rem_euclid(24) as u32;
    let monitor = MonitoringLoop::new(
        store,
        source,
        notifier,
        cfg,
        ClockState::starting_at(start_hour),
    );

    monitor.run().await;
    Ok(())
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `SOIL_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by the `SOIL_LOG_LEVEL` env var
///
/// This should be called once at application startup before any logging
/// or tracing macros are invoked. It installs the subscriber globally
/// for the lifetime of the process.
fn init_tracing() {
    // ---
    let span_events = match env::var("SOIL_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    // Determine if we should use colors
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    // Use RUST_LOG if available, otherwise fall back to SOIL_LOG_LEVEL
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("SOIL_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},sqlx::query=warn"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
