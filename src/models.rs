//! Data models for the soil moisture pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

// ---

/// One reading as produced by a [`crate::source::SensorSource`].
///
/// Moisture and dry-state are opaque inputs here: how the sensor maps raw
/// electrical levels to a percentage and a dry flag is its own business.
#[derive(Debug, Clone, Copy)]
pub struct SensorReading {
    // ---
    pub timestamp: DateTime<Utc>,
    pub moisture_percent: f64,
    pub is_dry: bool,
}

/// One stored row of the moisture history. Immutable once appended.
///
/// The auxiliary covariates (temperature, rainfall, light, irrigation) are
/// carried forward from the previous row when a sensor reading is appended;
/// only dedicated instruments would fill them with fresh values.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Sample {
    // ---
    pub timestamp: DateTime<Utc>,
    pub moisture: f64,
    pub temperature: f64,
    pub rainfall: f64,
    pub light: f64,
    pub irrigation: bool,
}

/// Predicted moisture percentages, one per future step, oldest step first.
/// Every value is de-normalized and clamped to `[0, 100]`.
#[derive(Debug, Clone, Serialize)]
pub struct Forecast {
    pub values: Vec<f64>,
}

impl Forecast {
    pub fn horizon(&self) -> usize {
        self.values.len()
    }
}

// ---

/// Why an alert decision came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlertReason {
    DryState,
    ScheduledWindow,
    Suppressed,
}

/// What a dispatched alert talks about: the current reading plus the
/// forecast computed in the same cycle.
#[derive(Debug, Clone, Serialize)]
pub struct AlertPayload {
    // ---
    pub moisture: f64,
    pub is_dry: bool,
    pub forecast: Forecast,
}

/// Outcome of one alert-policy evaluation.
#[derive(Debug, Clone)]
pub struct AlertDecision {
    // ---
    pub should_send: bool,
    pub reason: AlertReason,
    pub payload: AlertPayload,
}

impl AlertPayload {
    // ---
    pub fn subject(&self) -> String {
        "Plant Soil Moisture Alert & Prediction".to_string()
    }

    /// Render the notification body: status line, current moisture, and one
    /// line per forecast step, all moisture values to 2 decimal places.
    pub fn body(&self) -> String {
        // ---
        let status = if self.is_dry {
            "ALERT: Soil is DRY! Please water your plant ASAP!"
        } else {
            "Normal: Soil has enough moisture."
        };

        let mut body = format!("{status}\nCurrent soil moisture: {:.2}%\n", self.moisture);
        for (i, value) in self.forecast.values.iter().enumerate() {
            body.push_str(&format!("Forecast step {}: {value:.2}%\n", i + 1));
        }
        body
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn payload(is_dry: bool) -> AlertPayload {
        // ---
        AlertPayload {
            moisture: 31.456,
            is_dry,
            forecast: Forecast {
                values: vec![30.989, 30.1, 29.0],
            },
        }
    }

    #[test]
    fn body_contains_status_and_moisture() {
        // ---
        let dry = payload(true).body();
        assert!(dry.contains("ALERT: Soil is DRY!"));
        assert!(dry.contains("Current soil moisture: 31.46%"));

        let wet = payload(false).body();
        assert!(wet.contains("Normal: Soil has enough moisture."));
    }

    #[test]
    fn body_lists_every_forecast_step_to_two_decimals() {
        // ---
        let body = payload(true).body();
        assert!(body.contains("Forecast step 1: 30.99%"));
        assert!(body.contains("Forecast step 2: 30.10%"));
        assert!(body.contains("Forecast step 3: 29.00%"));
    }

    #[test]
    fn forecast_horizon_matches_value_count() {
        // ---
        let forecast = Forecast {
            values: vec![40.0, 39.5, 39.0],
        };
        assert_eq!(forecast.horizon(), 3);
    }
}
