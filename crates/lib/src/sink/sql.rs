//! SQL-backed persistence sink.
//!
//! Uses sqlx with `AnyPool` so the same code serves SQLite (feature
//! `sqlite`) and PostgreSQL (feature `postgres`). The schema is one table of
//! latest-scan rows keyed by tag id, created on connect; the upsert relies
//! on `ON CONFLICT`, which both dialects support.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;

use super::{ScanRecord, SinkError, TagSink};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS latest_scans (
    tag_id TEXT PRIMARY KEY,
    epc_hex TEXT,
    observed_at TEXT NOT NULL,
    authentic INTEGER NOT NULL,
    detail TEXT
)";

const UPSERT: &str = "INSERT INTO latest_scans (tag_id, epc_hex, observed_at, authentic, detail)
     VALUES ($1, $2, $3, $4, $5)
     ON CONFLICT (tag_id) DO UPDATE SET
         epc_hex = EXCLUDED.epc_hex,
         observed_at = EXCLUDED.observed_at,
         authentic = EXCLUDED.authentic,
         detail = EXCLUDED.detail";

/// Sink writing latest-scan rows through sqlx.
#[derive(Debug, Clone)]
pub struct SqlSink {
    pool: AnyPool,
}

impl SqlSink {
    /// Connect to the database at `url` and ensure the schema exists.
    pub async fn connect(url: &str) -> Result<Self, SinkError> {
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await
            .map_err(|e| SinkError::Connect {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .map_err(|e| SinkError::Database {
                reason: format!("Failed to initialize schema: {e}"),
            })?;

        Ok(Self { pool })
    }

    /// Access the underlying pool.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

#[async_trait]
impl TagSink for SqlSink {
    async fn upsert_latest(&self, record: &ScanRecord) -> Result<(), SinkError> {
        sqlx::query(UPSERT)
            .bind(&record.tag_id)
            .bind(&record.epc_hex)
            .bind(&record.observed_at)
            .bind(record.authentic as i64)
            .bind(&record.detail)
            .execute(&self.pool)
            .await
            .map_err(|e| SinkError::Database {
                reason: format!("Failed to upsert tag {}: {e}", record.tag_id),
            })?;
        Ok(())
    }
}
