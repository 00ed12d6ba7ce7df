#![cfg(feature = "db")]

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};

use super::{CacheEntry, CacheKey, CacheStore};
use crate::error::GridMixError;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    id BIGSERIAL PRIMARY KEY,
    function_name TEXT NOT NULL,
    key_params_json TEXT NOT NULL,
    key_digest TEXT NOT NULL,
    start_date DATE NOT NULL,
    end_date DATE NOT NULL,
    cached_at TIMESTAMPTZ NOT NULL,
    payload TEXT NOT NULL
)
"#;

const CREATE_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS cache_entries_lookup
    ON cache_entries (key_digest, start_date, end_date)
"#;

/// Postgres-backed cache store. No uniqueness constraint; the oldest row wins.
pub struct PgCacheStore {
    pool: PgPool,
}

impl PgCacheStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_INDEX).execute(&self.pool).await?;
        Ok(())
    }
}

fn db_error(e: sqlx::Error) -> GridMixError {
    GridMixError::Cache(e.to_string())
}

#[async_trait]
impl CacheStore for PgCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, GridMixError> {
        let row: Option<(String, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT payload, cached_at
            FROM cache_entries
            WHERE key_digest = $1 AND start_date = $2 AND end_date = $3
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .bind(&key.key_digest)
        .bind(key.start)
        .bind(key.end)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|(payload, cached_at)| CacheEntry { payload, cached_at }))
    }

    async fn put(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), GridMixError> {
        sqlx::query(
            r#"
            INSERT INTO cache_entries
                (function_name, key_params_json, key_digest, start_date, end_date, cached_at, payload)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&key.function_name)
        .bind(&key.params_json)
        .bind(&key.key_digest)
        .bind(key.start)
        .bind(key.end)
        .bind(entry.cached_at)
        .bind(&entry.payload)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "postgres"
    }
}
