//! The monitoring loop: one cycle per accepted reading.
//!
//! Cycle order is append → forecast → policy → dispatch. Ingestion is the
//! only stage that is not best-effort: a reading that passes the debounce
//! gate is recorded even when every later stage fails. No error in a cycle
//! ever terminates the loop; it logs and self-heals on the next reading.

use std::time::{Duration, Instant};

use chrono::{DateTime, Timelike, Utc};
use tracing::{debug, error, info, warn};

use crate::alert::{evaluate_elapsed, evaluate_on_state, AlertStrategy, ClockState};
use crate::config::Config;
use crate::error::PipelineError;
use crate::forecast::Forecaster;
use crate::models::AlertPayload;
use crate::notify::Notifier;
use crate::source::SensorSource;
use crate::store::SampleStore;

// ---

pub struct MonitoringLoop<S, N> {
    // ---
    store: SampleStore,
    source: S,
    notifier: N,
    config: Config,
    forecaster: Forecaster,
    clock: ClockState,
    last_accepted: Option<Instant>,
}

impl<S: SensorSource, N: Notifier> MonitoringLoop<S, N> {
    // ---
    pub fn new(
        store: SampleStore,
        source: S,
        notifier: N,
        config: Config,
        initial_clock: ClockState,
    ) -> Self {
        // ---
        let forecaster = Forecaster::new(
            config.seq_length,
            config.horizon,
            config.refit_each_cycle,
        );

        Self {
            store,
            source,
            notifier,
            config,
            forecaster,
            clock: initial_clock,
            last_accepted: None,
        }
    }

    /// Elapsed-hour watermark, exposed for observability.
    pub fn clock_state(&self) -> ClockState {
        self.clock
    }

    /// Run cycles forever on the configured polling cadence.
    pub async fn run(mut self) {
        // ---
        let period = Duration::from_secs(self.config.sample_interval_secs);
        let mut interval = tokio::time::interval(period);
        info!(
            "Monitoring loop started, sampling every {}s",
            self.config.sample_interval_secs
        );

        loop {
            interval.tick().await;
            self.cycle().await;
        }
    }

    /// One full monitoring cycle. Never returns an error: every failure
    /// mode is recoverable and handled in place.
    pub async fn cycle(&mut self) {
        // ---
        let reading = match self.source.next_reading().await {
            Ok(reading) => reading,
            Err(e) => {
                warn!("Sensor read failed, nothing recorded this cycle: {e}");
                return;
            }
        };

        // Debounce: a reading inside the quiet period of the previously
        // accepted one produces no cycle at all.
        if let Some(accepted_at) = self.last_accepted {
            let quiet = Duration::from_millis(self.config.debounce_ms);
            if accepted_at.elapsed() < quiet {
                debug!(
                    "Reading at {} inside {}ms debounce window, ignored",
                    reading.timestamp, self.config.debounce_ms
                );
                return;
            }
        }
        self.last_accepted = Some(Instant::now());

        info!(
            "Reading accepted: {:.2}% at {} (dry: {})",
            reading.moisture_percent, reading.timestamp, reading.is_dry
        );

        let history = match self.store.append_reading(&reading).await {
            Ok(history) => history,
            Err(e) => {
                error!("Store append failed at {}: {e}", reading.timestamp);
                return;
            }
        };

        let forecast = match self.forecaster.fit_and_forecast(&history) {
            Ok(forecast) => forecast,
            Err(e @ PipelineError::InsufficientHistory { .. }) => {
                info!("Sample recorded, alerting skipped: {e}");
                return;
            }
            Err(e) => {
                warn!("Forecast failed at {}, retrying next cycle: {e}", reading.timestamp);
                return;
            }
        };

        let payload = AlertPayload {
            moisture: reading.moisture_percent,
            is_dry: reading.is_dry,
            forecast,
        };

        let hour = self.policy_hour(reading.timestamp);
        let decision = match self.config.strategy {
            AlertStrategy::OnState => {
                evaluate_on_state(payload, hour, &self.config.schedule_hours)
            }
            AlertStrategy::Elapsed => {
                let (clock, decision) =
                    evaluate_elapsed(self.clock, payload, hour, self.config.elapsed_threshold);
                self.clock = clock;
                decision
            }
        };

        if !decision.should_send {
            debug!("Alert suppressed at hour {hour} ({:?})", decision.reason);
            return;
        }

        info!("Dispatching alert ({:?})", decision.reason);
        let subject = decision.payload.subject();
        let body = decision.payload.body();
        if let Err(e) = self.notifier.send(&subject, &body).await {
            // Logged and dropped; no retry for this cycle.
            error!("Delivery failed at {}: {e}", reading.timestamp);
        }
    }

    /// Hour of day used by the policies, after the configured fixed offset.
    fn policy_hour(&self, timestamp: DateTime<Utc>) -> u32 {
        // ---
        (i64::from(timestamp.hour()) + self.config.tz_offset_hours).rem_euclid(24) as u32
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::SensorReading;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use sqlx::sqlite::SqlitePoolOptions;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    struct ScriptedSensor {
        readings: VecDeque<SensorReading>,
    }

    #[async_trait]
    impl SensorSource for ScriptedSensor {
        async fn next_reading(&mut self) -> Result<SensorReading, PipelineError> {
            // ---
            self.readings
                .pop_front()
                .ok_or_else(|| PipelineError::SourceReadFailure("script exhausted".into()))
        }
    }

    #[derive(Clone, Default)]
    struct RecordingNotifier {
        sent: Arc<Mutex<Vec<(String, String)>>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, subject: &str, body: &str) -> Result<(), PipelineError> {
            // ---
            if self.fail {
                return Err(PipelineError::DeliveryFailure("simulated outage".into()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((subject.to_string(), body.to_string()));
            Ok(())
        }
    }

    fn test_config(strategy: AlertStrategy) -> Config {
        // ---
        Config {
            db_url: "sqlite::memory:".into(),
            webhook_url: "http://localhost/hook".into(),
            recipient: "gardener".into(),
            seq_length: 3,
            horizon: 3,
            schedule_hours: vec![8, 20],
            elapsed_threshold: 3,
            sample_interval_secs: 1800,
            debounce_ms: 0, // cycles run back-to-back in tests
            tz_offset_hours: 0,
            strategy,
            refit_each_cycle: true,
        }
    }

    async fn test_store() -> SampleStore {
        // ---
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::schema::create_schema(&pool).await.unwrap();
        SampleStore::new(pool)
    }

    /// Ten readings trending down from 45% to 30%, half-hour apart at an
    /// hour outside the schedule window, dry flag on the last one.
    fn downward_trend() -> VecDeque<SensorReading> {
        // ---
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        (0..10)
            .map(|i| SensorReading {
                timestamp: start + ChronoDuration::minutes(30 * i),
                moisture_percent: 45.0 - (45.0 - 30.0) * i as f64 / 9.0,
                is_dry: i == 9,
            })
            .collect()
    }

    #[tokio::test]
    async fn dry_reading_after_trend_triggers_one_alert() {
        // ---
        let notifier = RecordingNotifier::default();
        let mut monitor = MonitoringLoop::new(
            test_store().await,
            ScriptedSensor {
                readings: downward_trend(),
            },
            notifier.clone(),
            test_config(AlertStrategy::OnState),
            ClockState::starting_at(10),
        );

        for _ in 0..10 {
            monitor.cycle().await;
        }

        // Early cycles lack history, wet cycles at 10:xx are outside the
        // schedule window; only the final dry reading alerts.
        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (subject, body) = &sent[0];
        assert!(subject.contains("Soil Moisture"));
        assert!(body.contains("ALERT: Soil is DRY!"));
        assert!(body.contains("Forecast step 3:"));

        // Structural bound on the forecast embedded in the body: three
        // steps, each a percentage not far above the observed range.
        for line in body.lines().filter(|l| l.starts_with("Forecast step")) {
            let value: f64 = line
                .split(": ")
                .nth(1)
                .unwrap()
                .trim_end_matches('%')
                .parse()
                .unwrap();
            assert!((0.0..=70.0).contains(&value), "forecast {value} unreasonable");
        }
    }

    #[tokio::test]
    async fn delivery_failure_never_escapes_or_touches_history() {
        // ---
        let store = test_store().await;
        let notifier = RecordingNotifier {
            sent: Arc::default(),
            fail: true,
        };
        let mut monitor = MonitoringLoop::new(
            store.clone(),
            ScriptedSensor {
                readings: downward_trend(),
            },
            notifier,
            test_config(AlertStrategy::OnState),
            ClockState::starting_at(10),
        );

        for _ in 0..10 {
            monitor.cycle().await;
        }

        // Every reading was still recorded despite the failing notifier.
        assert_eq!(store.history().await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn elapsed_watermark_advances_even_when_delivery_fails() {
        // ---
        let mut config = test_config(AlertStrategy::Elapsed);
        config.seq_length = 2;

        let start = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let readings: VecDeque<SensorReading> = (0..4)
            .map(|i| SensorReading {
                timestamp: start + ChronoDuration::hours(2 * i),
                moisture_percent: 42.0 - i as f64,
                is_dry: false,
            })
            .collect();

        let mut monitor = MonitoringLoop::new(
            test_store().await,
            ScriptedSensor { readings },
            RecordingNotifier {
                sent: Arc::default(),
                fail: true,
            },
            config,
            ClockState::starting_at(5),
        );

        for _ in 0..4 {
            monitor.cycle().await;
        }

        // The first two cycles stop at insufficient history before the
        // policy runs; the 14 and 16 o'clock readings then move the
        // watermark no matter what the notifier did with the alerts.
        assert_eq!(monitor.clock_state().last_notified_hour, 16);
    }

    #[tokio::test]
    async fn training_failure_skips_alert_but_keeps_sample() {
        // ---
        let store = test_store().await;
        let notifier = RecordingNotifier::default();

        let start = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let mut readings: VecDeque<SensorReading> = (0..5)
            .map(|i| SensorReading {
                timestamp: start + ChronoDuration::minutes(30 * i),
                moisture_percent: 45.0 - i as f64,
                is_dry: false,
            })
            .collect();
        // A non-finite moisture value survives min-max fitting, turns its
        // own normalized value into NaN, and poisons the training loss.
        // (Infinity rather than NaN: SQLite stores NaN as NULL, so NaN
        // would never make it back out of the store.)
        readings.push_back(SensorReading {
            timestamp: start + ChronoDuration::minutes(150),
            moisture_percent: f64::INFINITY,
            is_dry: true,
        });

        let mut monitor = MonitoringLoop::new(
            store.clone(),
            ScriptedSensor { readings },
            notifier.clone(),
            test_config(AlertStrategy::OnState),
            ClockState::starting_at(10),
        );

        for _ in 0..6 {
            monitor.cycle().await;
        }

        // The bad reading is still recorded: ingestion is not best-effort.
        assert_eq!(store.history().await.unwrap().len(), 6);

        // But its cycle stopped at training, so the dry reading that would
        // otherwise always alert produced no send.
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn source_failure_skips_ingestion_entirely() {
        // ---
        let store = test_store().await;
        let mut monitor = MonitoringLoop::new(
            store.clone(),
            ScriptedSensor {
                readings: VecDeque::new(),
            },
            RecordingNotifier::default(),
            test_config(AlertStrategy::OnState),
            ClockState::starting_at(10),
        );

        monitor.cycle().await;
        assert!(store.history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn debounce_ignores_rapid_readings() {
        // ---
        let mut config = test_config(AlertStrategy::OnState);
        config.debounce_ms = 60_000;

        let store = test_store().await;
        let mut monitor = MonitoringLoop::new(
            store.clone(),
            ScriptedSensor {
                readings: downward_trend(),
            },
            RecordingNotifier::default(),
            config,
            ClockState::starting_at(10),
        );

        for _ in 0..5 {
            monitor.cycle().await;
        }

        // Only the first reading beat the quiet period.
        assert_eq!(store.history().await.unwrap().len(), 1);
    }
}
