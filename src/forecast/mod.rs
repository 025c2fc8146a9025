//! Forecasting gateway: normalization, windowing, model fit, and the
//! recursive multi-step forecast.
//!
//! Each forecast step feeds on the previous step's own prediction, so
//! uncertainty compounds over the horizon. That is inherent to forecasting
//! without future ground truth and is accepted here; the structural
//! guarantees are output length and the `[0, 100]` clamp, not accuracy.

mod model;
mod window;

pub use model::SequenceModel;
pub use window::{make_windows, MinMaxScaler, Window};

use rand::thread_rng;
use tracing::debug;

use crate::error::PipelineError;
use crate::models::{Forecast, Sample};

// ---

/// Fits a fresh model on the current history and rolls it forward for a
/// fixed horizon.
///
/// By default the model is refit from scratch on every invocation — simple,
/// and it adapts to drift. With `refit_each_cycle` off, the first
/// successfully fitted model and its scaler are reused for the rest of the
/// process lifetime.
#[derive(Debug)]
pub struct Forecaster {
    // ---
    seq_len: usize,
    horizon: usize,
    refit_each_cycle: bool,
    fitted: Option<(SequenceModel, MinMaxScaler)>,
}

impl Forecaster {
    // ---
    pub fn new(seq_len: usize, horizon: usize, refit_each_cycle: bool) -> Self {
        Self {
            seq_len,
            horizon,
            refit_each_cycle,
            fitted: None,
        }
    }

    /// Produce a forecast from the moisture column of `history`.
    ///
    /// Steps: min-max scale the column, window it, fit the sequence model,
    /// then predict recursively — each step's input window is a new value
    /// built from the prior window's tail plus the prior prediction. Output
    /// values are de-normalized and clamped to `[0, 100]`.
    ///
    /// Errors: [`PipelineError::InsufficientHistory`] when the history
    /// cannot produce a single training window, and
    /// [`PipelineError::TrainingFailure`] when fitting or prediction goes
    /// non-finite — no partial forecast is ever returned.
    pub fn fit_and_forecast(&mut self, history: &[Sample]) -> Result<Forecast, PipelineError> {
        // ---
        let series: Vec<f64> = history.iter().map(|s| s.moisture).collect();

        let (model, scaler) = match (&self.fitted, self.refit_each_cycle) {
            (Some(fitted), false) => {
                if series.len() < self.seq_len {
                    return Err(PipelineError::InsufficientHistory {
                        have: series.len(),
                        need: self.seq_len,
                    });
                }
                debug!("Reusing previously fitted model");
                fitted.clone()
            }
            _ => {
                let scaler = MinMaxScaler::fit(&series);
                let scaled = scaler.transform_series(&series);
                let windows = make_windows(&scaled, self.seq_len)?;

                let mut model = SequenceModel::new(self.seq_len, &mut thread_rng());
                model.fit(&windows)?;

                if !self.refit_each_cycle {
                    self.fitted = Some((model.clone(), scaler));
                }
                (model, scaler)
            }
        };

        let scaled = scaler.transform_series(&series);
        let mut rolling: Vec<f64> = scaled[scaled.len() - self.seq_len..].to_vec();
        let mut values = Vec::with_capacity(self.horizon);

        for step in 0..self.horizon {
            let predicted = model.predict(&rolling);
            if !predicted.is_finite() {
                return Err(PipelineError::TrainingFailure(format!(
                    "non-finite prediction at forecast step {}",
                    step + 1
                )));
            }

            values.push(scaler.invert(predicted).clamp(0.0, 100.0));

            // New immutable window: drop the oldest value, append the
            // prediction itself as the next step's input.
            rolling = rolling[1..]
                .iter()
                .copied()
                .chain(std::iter::once(predicted))
                .collect();
        }

        debug!("Forecast produced: {:?}", values);
        Ok(Forecast { values })
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn history(moistures: &[f64]) -> Vec<Sample> {
        // ---
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        moistures
            .iter()
            .enumerate()
            .map(|(i, &m)| Sample {
                timestamp: start + Duration::minutes(30 * i as i64),
                moisture: m,
                temperature: 22.0,
                rainfall: 0.0,
                light: 550.0,
                irrigation: false,
            })
            .collect()
    }

    #[test]
    fn forecast_has_horizon_values_all_in_range() {
        // ---
        let samples = history(&[45.0, 44.0, 42.5, 41.0, 39.0, 37.5, 35.0, 33.0, 31.5, 30.0]);
        let mut forecaster = Forecaster::new(3, 3, true);

        let forecast = forecaster.fit_and_forecast(&samples).unwrap();
        assert_eq!(forecast.horizon(), 3);
        for v in &forecast.values {
            assert!((0.0..=100.0).contains(v), "value {v} out of range");
        }
        // No accuracy assertion on individual steps: each step feeds on the
        // previous prediction, so variance should not decrease with step
        // index and exact values are model-internal.
    }

    #[test]
    fn clamp_holds_for_wild_series_scales() {
        // ---
        // Values far outside the percentage range de-normalize far outside
        // [0, 100] unless clamping applies.
        let samples = history(&[-500.0, 800.0, -200.0, 650.0, -90.0, 700.0, -300.0, 500.0]);
        let mut forecaster = Forecaster::new(3, 5, true);

        let forecast = forecaster.fit_and_forecast(&samples).unwrap();
        assert_eq!(forecast.horizon(), 5);
        for v in &forecast.values {
            assert!((0.0..=100.0).contains(v), "value {v} escaped the clamp");
        }
    }

    #[test]
    fn insufficient_history_propagates() {
        // ---
        let samples = history(&[40.0, 39.0, 38.0]);
        let mut forecaster = Forecaster::new(3, 3, true);

        assert!(matches!(
            forecaster.fit_and_forecast(&samples),
            Err(PipelineError::InsufficientHistory { have: 3, need: 4 })
        ));
    }

    #[test]
    fn fitted_model_is_reused_when_refit_disabled() {
        // ---
        let samples = history(&[45.0, 44.0, 43.0, 42.0, 41.0, 40.0]);
        let mut forecaster = Forecaster::new(3, 3, false);
        forecaster.fit_and_forecast(&samples).unwrap();

        // A history too short to train on still forecasts off the cached
        // model, as long as it covers one input window.
        let short = history(&[40.0, 39.5, 39.0]);
        let forecast = forecaster.fit_and_forecast(&short).unwrap();
        assert_eq!(forecast.horizon(), 3);
    }
}
