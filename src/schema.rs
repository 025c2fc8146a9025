//! Database schema management for `soilflow`.
//!
//! Ensures the sample table and its indexes exist before the monitoring
//! loop starts. Applied once on startup from `main.rs` (EMBP: single
//! gateway call).

use anyhow::Result;
use sqlx::SqlitePool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates the `soil_samples` table holding the append-only moisture
/// history. The UNIQUE constraint on `timestamp` enforces the history
/// invariant that no two samples share an instant. Safe to call on every
/// startup; no-op if objects already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // Append-only history consumed by the forecaster each cycle
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS soil_samples (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp   TEXT    NOT NULL UNIQUE,
            moisture    REAL    NOT NULL,
            temperature REAL    NOT NULL,
            rainfall    REAL    NOT NULL,
            light       REAL    NOT NULL,
            irrigation  BOOLEAN NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // History is always read in timestamp order
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_soil_samples_timestamp
            ON soil_samples (timestamp);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
