//! Append-only sample store backed by SQLite.
//!
//! The store is the single owner of the moisture history: the monitoring
//! loop appends one row per accepted reading and gets the full ordered
//! history back, ready for windowing. Rows are never updated or deleted.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::PipelineError;
use crate::models::{Sample, SensorReading};

// ---

#[derive(Debug, Clone)]
pub struct SampleStore {
    pool: SqlitePool,
}

impl SampleStore {
    // ---
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append one sensor reading and return the updated full history,
    /// ordered by timestamp ascending.
    ///
    /// The auxiliary covariates are inherited from the most recent stored
    /// row (zeroes when the history is empty); the irrigation flag is
    /// recorded as false for sensor-driven appends. The append is durable
    /// before the history is returned.
    pub async fn append_reading(
        &self,
        reading: &SensorReading,
    ) -> Result<Vec<Sample>, PipelineError> {
        // ---
        let last = self.latest().await?;
        let (temperature, rainfall, light) = match &last {
            Some(row) => (row.temperature, row.rainfall, row.light),
            None => (0.0, 0.0, 0.0),
        };

        sqlx::query(
            r#"
            INSERT INTO soil_samples (
                timestamp, moisture, temperature, rainfall, light, irrigation
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(reading.timestamp)
        .bind(reading.moisture_percent)
        .bind(temperature)
        .bind(rainfall)
        .bind(light)
        .bind(false)
        .execute(&self.pool)
        .await?;

        debug!(
            "Appended sample at {} with moisture {:.2}%",
            reading.timestamp, reading.moisture_percent
        );

        self.history().await
    }

    /// Full stored history, oldest first.
    pub async fn history(&self) -> Result<Vec<Sample>, PipelineError> {
        // ---
        let rows = sqlx::query_as::<_, Sample>(
            r#"
            SELECT timestamp, moisture, temperature, rainfall, light, irrigation
            FROM soil_samples
            ORDER BY timestamp ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Most recent stored sample, if any.
    async fn latest(&self) -> Result<Option<Sample>, PipelineError> {
        // ---
        let row = sqlx::query_as::<_, Sample>(
            r#"
            SELECT timestamp, moisture, temperature, rainfall, light, irrigation
            FROM soil_samples
            ORDER BY timestamp DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
