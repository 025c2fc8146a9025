//! Library gateway for the `soilflow` monitoring service.
//!
//! The pipeline runs as a single-threaded cycle: a new moisture reading is
//! appended to the sample history, a compact sequence model is fit on the
//! history and rolled forward for a short forecast horizon, and an alert
//! policy decides whether the cycle's result is worth notifying about.
//!
//! This module follows the Explicit Module Boundary Pattern (EMBP): each
//! component lives in its own module, and the binary (`main.rs`) only talks
//! to the re-exports below — it has no knowledge of module internals.

pub mod alert;
pub mod config;
pub mod error;
pub mod forecast;
pub mod models;
pub mod monitor;
pub mod notify;
pub mod schema;
pub mod source;
pub mod store;

pub use config::Config;
pub use error::PipelineError;
pub use models::{AlertDecision, AlertPayload, AlertReason, Forecast, Sample, SensorReading};
