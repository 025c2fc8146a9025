//! Sequence windowing and min-max normalization.
//!
//! The windower turns an ordered moisture series into supervised training
//! pairs: the previous `seq_len` values predict the next one. Scaling is
//! fit once over the full series and the same scaler de-normalizes model
//! output later — fitting it on anything else would mis-scale forecasts.

use crate::error::PipelineError;

// ---

/// One training pair: `seq_len` normalized inputs and the next value.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    // ---
    pub input: Vec<f64>,
    pub target: f64,
}

/// Min-max scaler mapping the fitted series onto `[0, 1]`.
#[derive(Debug, Clone, Copy)]
pub struct MinMaxScaler {
    min: f64,
    range: f64,
}

impl MinMaxScaler {
    // ---
    /// Fit scale parameters on a series. A constant series gets a unit
    /// range so transforms stay finite.
    pub fn fit(series: &[f64]) -> Self {
        // ---
        let min = series.iter().copied().fold(f64::INFINITY, f64::min);
        let max = series.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = if (max - min).abs() < f64::EPSILON {
            1.0
        } else {
            max - min
        };
        Self { min, range }
    }

    pub fn transform(&self, value: f64) -> f64 {
        (value - self.min) / self.range
    }

    pub fn transform_series(&self, series: &[f64]) -> Vec<f64> {
        series.iter().map(|&v| self.transform(v)).collect()
    }

    pub fn invert(&self, scaled: f64) -> f64 {
        scaled * self.range + self.min
    }
}

// ---

/// Build supervised windows from an ordered series, oldest first.
///
/// Window *i* pairs `series[i..i+seq_len]` with target `series[i+seq_len]`,
/// yielding exactly `len - seq_len` windows. Fails with
/// [`PipelineError::InsufficientHistory`] when the series is not strictly
/// longer than `seq_len`.
pub fn make_windows(series: &[f64], seq_len: usize) -> Result<Vec<Window>, PipelineError> {
    // ---
    if series.len() <= seq_len {
        return Err(PipelineError::InsufficientHistory {
            have: series.len(),
            need: seq_len + 1,
        });
    }

    let windows = (0..series.len() - seq_len)
        .map(|i| Window {
            input: series[i..i + seq_len].to_vec(),
            target: series[i + seq_len],
        })
        .collect();

    Ok(windows)
}
