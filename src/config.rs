//! Configuration loader for the `soilflow` monitoring service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.

use std::env;

use anyhow::{anyhow, Result};

use crate::alert::AlertStrategy;

/// Parse an optional environment variable into any `FromStr` type, with a
/// default value.
macro_rules! parse_env {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// SQLite connection string for the sample store.
    pub db_url: String,

    /// Webhook endpoint that relays rendered alerts.
    pub webhook_url: String,

    /// Recipient identifier forwarded in the webhook payload.
    pub recipient: String,

    /// How many past values form one model input window.
    pub seq_length: usize,

    /// How many future steps each forecast covers.
    pub horizon: usize,

    /// Hours of day (0-23) at which wet-state status alerts are allowed
    /// (Strategy A).
    pub schedule_hours: Vec<u32>,

    /// Minimum hour gap before an elapsed-hour alert fires (Strategy B).
    pub elapsed_threshold: u32,

    /// Polling cadence in seconds.
    pub sample_interval_secs: u64,

    /// Minimum quiet period between accepted readings, in milliseconds.
    pub debounce_ms: u64,

    /// Fixed offset applied to the wall-clock hour before policy evaluation.
    pub tz_offset_hours: i64,

    /// Which alert policy gates notifications.
    pub strategy: AlertStrategy,

    /// Refit the forecast model from scratch every cycle (default). When
    /// false, the first successfully fitted model is reused across cycles.
    pub refit_each_cycle: bool,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – SQLite connection string
/// - `ALERT_WEBHOOK_URL` – webhook endpoint for alert delivery
/// - `ALERT_RECIPIENT` – recipient identifier for the webhook payload
///
/// Optional:
/// - `SEQ_LENGTH` – input window length (default: 3)
/// - `FORECAST_HORIZON` – forecast steps per cycle (default: 3)
/// - `SCHEDULE_HOURS` – comma-separated hours for wet-state alerts (default: "8,20")
/// - `ELAPSED_HOUR_THRESHOLD` – Strategy B hour gap (default: 3)
/// - `SAMPLE_INTERVAL_SECS` – polling cadence (default: 1800)
/// - `DEBOUNCE_MS` – reading debounce window (default: 3000)
/// - `TZ_OFFSET_HOURS` – hour offset for policy clocks (default: 0)
/// - `ALERT_STRATEGY` – "on_state" or "elapsed" (default: "on_state")
/// - `REFIT_EACH_CYCLE` – "true"/"false" (default: true)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let db_url = require_env!("DATABASE_URL");
    let webhook_url = require_env!("ALERT_WEBHOOK_URL");
    let recipient = require_env!("ALERT_RECIPIENT");

    let seq_length = parse_env!("SEQ_LENGTH", usize, 3);
    let horizon = parse_env!("FORECAST_HORIZON", usize, 3);
    let elapsed_threshold = parse_env!("ELAPSED_HOUR_THRESHOLD", u32, 3);
    let sample_interval_secs = parse_env!("SAMPLE_INTERVAL_SECS", u64, 1800);
    let debounce_ms = parse_env!("DEBOUNCE_MS", u64, 3000);
    let tz_offset_hours = parse_env!("TZ_OFFSET_HOURS", i64, 0);
    let strategy = parse_env!("ALERT_STRATEGY", AlertStrategy, AlertStrategy::OnState);
    let refit_each_cycle = parse_env!("REFIT_EACH_CYCLE", bool, true);

    let schedule_hours = match env::var("SCHEDULE_HOURS") {
        Ok(raw) => parse_schedule_hours(&raw)?,
        Err(_) => vec![8, 20],
    };

    if seq_length == 0 {
        return Err(anyhow!("SEQ_LENGTH must be at least 1"));
    }
    if horizon == 0 {
        return Err(anyhow!("FORECAST_HORIZON must be at least 1"));
    }

    Ok(Config {
        db_url,
        webhook_url,
        recipient,
        seq_length,
        horizon,
        schedule_hours,
        elapsed_threshold,
        sample_interval_secs,
        debounce_ms,
        tz_offset_hours,
        strategy,
        refit_each_cycle,
    })
}

/// Parse a comma-separated list of hours, each in `0..=23`.
fn parse_schedule_hours(raw: &str) -> Result<Vec<u32>> {
    // ---
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let hour: u32 = s
                .parse()
                .map_err(|e| anyhow!("Invalid SCHEDULE_HOURS entry '{}': {}", s, e))?;
            if hour > 23 {
                return Err(anyhow!("SCHEDULE_HOURS entry {} out of range 0-23", hour));
            }
            Ok(hour)
        })
        .collect()
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the webhook URL path (it often carries an access token) while
    /// showing all other configuration values that were loaded.
    pub fn log_config(&self) {
        // ---
        let masked_webhook = match self.webhook_url.find("://") {
            Some(scheme_end) => match self.webhook_url[scheme_end + 3..].find('/') {
                Some(path_pos) => {
                    format!("{}/****", &self.webhook_url[..scheme_end + 3 + path_pos])
                }
                None => self.webhook_url.clone(),
            },
            None => "****".to_string(),
        };

        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL           : {}", self.db_url);
        tracing::info!("  ALERT_WEBHOOK_URL      : {}", masked_webhook);
        tracing::info!("  ALERT_RECIPIENT        : {}", self.recipient);
        tracing::info!("  SEQ_LENGTH             : {}", self.seq_length);
        tracing::info!("  FORECAST_HORIZON       : {}", self.horizon);
        tracing::info!("  SCHEDULE_HOURS         : {:?}", self.schedule_hours);
        tracing::info!("  ELAPSED_HOUR_THRESHOLD : {}", self.elapsed_threshold);
        tracing::info!("  SAMPLE_INTERVAL_SECS   : {}", self.sample_interval_secs);
        tracing::info!("  DEBOUNCE_MS            : {}", self.debounce_ms);
        tracing::info!("  TZ_OFFSET_HOURS        : {}", self.tz_offset_hours);
        tracing::info!("  ALERT_STRATEGY         : {:?}", self.strategy);
        tracing::info!("  REFIT_EACH_CYCLE       : {}", self.refit_each_cycle);
    }
}
