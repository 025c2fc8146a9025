//! Sensor acquisition boundary.
//!
//! The pipeline treats moisture and dry-state as opaque inputs: anything
//! that can yield a `(timestamp, moisture %, dry flag)` triple can drive
//! the loop. Real deployments plug in an ADC- or I2C-backed source here.

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;

use crate::error::PipelineError;
use crate::models::SensorReading;

// ---

/// Yields one reading per cycle, either on edge events or a polling cadence.
#[async_trait]
pub trait SensorSource: Send {
    async fn next_reading(&mut self) -> Result<SensorReading, PipelineError>;
}

/// Stand-in source for running without hardware.
///
/// Mimics a digital-only moisture probe on a test bench: the
/// dry/wet state flips occasionally, and the percentage is drawn from a
/// fixed uniform band per state (30-35% dry, 38-45% wet). None of these
/// ranges leak into the core, which sees only the resulting reading.
#[derive(Debug)]
pub struct SimulatedSensor {
    dry: bool,
    flip_probability: f64,
}

impl SimulatedSensor {
    // ---
    pub fn new() -> Self {
        Self {
            dry: false,
            flip_probability: 0.3,
        }
    }
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SensorSource for SimulatedSensor {
    async fn next_reading(&mut self) -> Result<SensorReading, PipelineError> {
        // ---
        let mut rng = rand::thread_rng();
        if rng.gen_bool(self.flip_probability) {
            self.dry = !self.dry;
        }

        let moisture_percent = if self.dry {
            rng.gen_range(30.0..35.0)
        } else {
            rng.gen_range(38.0..45.0)
        };

        Ok(SensorReading {
            timestamp: Utc::now(),
            moisture_percent,
            is_dry: self.dry,
        })
    }
}
