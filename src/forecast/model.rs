//! Compact sequence-regression model.
//!
//! A single hidden tanh layer followed by a linear output, trained with
//! plain SGD on the windowed series. Small enough to refit from scratch on
//! every cycle, which keeps the model tracking drift in the moisture curve
//! without any persistence.

use rand::Rng;

use crate::error::PipelineError;
use crate::forecast::window::Window;

// ---

const HIDDEN_UNITS: usize = 8;
const TRAIN_EPOCHS: usize = 200;
const LEARNING_RATE: f64 = 0.05;

/// One-hidden-layer regressor predicting the next normalized value from
/// the previous `seq_len` normalized values.
#[derive(Debug, Clone)]
pub struct SequenceModel {
    // ---
    seq_len: usize,
    w1: Vec<Vec<f64>>,
    b1: Vec<f64>,
    w2: Vec<f64>,
    b2: f64,
}

impl SequenceModel {
    // ---
    /// Fresh model with small random weights. Initialization is stochastic;
    /// callers wanting reproducibility pass a seeded rng.
    pub fn new(seq_len: usize, rng: &mut impl Rng) -> Self {
        // ---
        let w1 = (0..HIDDEN_UNITS)
            .map(|_| (0..seq_len).map(|_| rng.gen_range(-0.5..0.5)).collect())
            .collect();
        let b1 = vec![0.0; HIDDEN_UNITS];
        let w2 = (0..HIDDEN_UNITS).map(|_| rng.gen_range(-0.5..0.5)).collect();

        Self {
            seq_len,
            w1,
            b1,
            w2,
            b2: 0.0,
        }
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    /// Fit on windowed training pairs with per-sample SGD.
    ///
    /// Fails with [`PipelineError::TrainingFailure`] if the loss or any
    /// parameter goes non-finite; the model must not be used for
    /// prediction after that.
    pub fn fit(&mut self, windows: &[Window]) -> Result<(), PipelineError> {
        // ---
        let mut last_epoch_loss = 0.0;

        for _ in 0..TRAIN_EPOCHS {
            last_epoch_loss = 0.0;

            for window in windows {
                let (hidden, output) = self.forward(&window.input);
                let err = output - window.target;
                last_epoch_loss += err * err;

                // Output layer gradients
                let d_out = 2.0 * err;
                for j in 0..HIDDEN_UNITS {
                    // Hidden layer gradient through tanh
                    let d_pre = d_out * self.w2[j] * (1.0 - hidden[j] * hidden[j]);
                    for k in 0..self.seq_len {
                        self.w1[j][k] -= LEARNING_RATE * d_pre * window.input[k];
                    }
                    self.b1[j] -= LEARNING_RATE * d_pre;
                    self.w2[j] -= LEARNING_RATE * d_out * hidden[j];
                }
                self.b2 -= LEARNING_RATE * d_out;
            }

            if !last_epoch_loss.is_finite() {
                return Err(PipelineError::TrainingFailure(format!(
                    "non-finite loss after SGD epoch over {} windows",
                    windows.len()
                )));
            }
        }

        if !self.params_finite() {
            return Err(PipelineError::TrainingFailure(
                "non-finite model parameters after training".to_string(),
            ));
        }

        tracing::debug!(
            "Model fit complete: {} windows, final epoch loss {:.6}",
            windows.len(),
            last_epoch_loss
        );
        Ok(())
    }

    /// Predict the next normalized value from a window of `seq_len`
    /// normalized values.
    pub fn predict(&self, input: &[f64]) -> f64 {
        self.forward(input).1
    }

    fn forward(&self, input: &[f64]) -> (Vec<f64>, f64) {
        // ---
        let hidden: Vec<f64> = (0..HIDDEN_UNITS)
            .map(|j| {
                let pre: f64 = self.w1[j]
                    .iter()
                    .zip(input)
                    .map(|(w, x)| w * x)
                    .sum::<f64>()
                    + self.b1[j];
                pre.tanh()
            })
            .collect();

        let output = self
            .w2
            .iter()
            .zip(&hidden)
            .map(|(w, h)| w * h)
            .sum::<f64>()
            + self.b2;

        (hidden, output)
    }

    fn params_finite(&self) -> bool {
        // ---
        self.w1.iter().flatten().all(|w| w.is_finite())
            && self.b1.iter().all(|b| b.is_finite())
            && self.w2.iter().all(|w| w.is_finite())
            && self.b2.is_finite()
    }
}
