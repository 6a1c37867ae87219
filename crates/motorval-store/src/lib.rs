//! # Motorval Store
//!
//! DuckDB-based storage layer for motorval.
//!
//! Two tables back the valuation service:
//!
//! | Table | Description |
//! |-------|-------------|
//! | `valuations` | One immutable valuation per VRM, unique on `vrm` |
//! | `provider_logs` | One row per upstream provider invocation |
//!
//! All user-provided values are passed through parameterized queries.
//! Uniqueness races on `valuations.vrm` are reported as
//! [`StoreError::UniqueViolation`] so callers can adopt the winning row
//! instead of failing; the detection is portable (conflict-tolerant insert
//! plus a changed-row count) rather than a comparison against an engine
//! error code.

pub mod duckdb;
pub mod migrations;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::ToSql;
use serde::Serialize;
use thiserror::Error;

pub use crate::duckdb::{DuckDbConnectionManager, PooledConnection};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A valuation already exists for this VRM. Benign under concurrency:
    /// the caller should re-read and adopt the stored row.
    #[error("valuation for '{vrm}' already exists")]
    UniqueViolation { vrm: String },
}

impl StoreError {
    /// Whether this error is a benign uniqueness race on insert.
    #[must_use]
    pub const fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation { .. })
    }
}

/// Configuration for the store database.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Root directory for motorval data.
    pub motorval_home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of idle connections in the pool.
    pub max_pool_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let motorval_home = resolve_motorval_home();
        let db_path = motorval_home.join("valuations.duckdb");
        Self {
            motorval_home,
            db_path,
            max_pool_size: 4,
        }
    }
}

/// A stored vehicle valuation.
///
/// `provider` is nullable: rows written before failover was introduced carry
/// no provider label. The presentation-time default is applied by the
/// service layer, never written back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationRow {
    /// Vehicle registration mark, the unique key.
    pub vrm: String,
    /// Lower bound of the valuation.
    pub lowest_value: f64,
    /// Upper bound of the valuation.
    pub highest_value: f64,
    /// Display name of the provider that produced the valuation.
    pub provider: Option<String>,
    /// Creation timestamp as ISO 8601 string.
    pub created_at: String,
}

/// One upstream provider invocation, success or failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderLogRow {
    /// Row id (UUID v4).
    pub id: String,
    /// VRM the call was made for.
    pub vrm: String,
    /// Display name of the provider that was invoked.
    pub provider: String,
    /// Full request URL.
    pub url: String,
    /// Wall-clock duration of the call in milliseconds.
    pub duration_ms: i64,
    /// HTTP status code, when a response was received.
    pub status_code: Option<i32>,
    /// Error message for failed calls.
    pub error_message: Option<String>,
    /// Call start timestamp as ISO 8601 string.
    pub timestamp: String,
}

/// The main store interface for valuations and provider call logs.
#[derive(Clone)]
pub struct ValuationStore {
    manager: DuckDbConnectionManager,
}

impl ValuationStore {
    /// Open a store with default configuration.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(StoreConfig::default())
    }

    /// Open a store with the specified configuration.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let manager = DuckDbConnectionManager::new(config.db_path.clone(), config.max_pool_size);
        let store = Self { manager };
        store.initialize()?;
        Ok(store)
    }

    /// Initialize the database schema.
    ///
    /// # Errors
    /// Returns an error if a migration fails.
    pub fn initialize(&self) -> Result<(), StoreError> {
        let connection = self.manager.acquire()?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    /// Look up the stored valuation for a VRM.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn find_valuation(&self, vrm: &str) -> Result<Option<ValuationRow>, StoreError> {
        let connection = self.manager.acquire()?;
        let result = connection.query_row(
            "SELECT vrm, lowest_value, highest_value, provider, CAST(created_at AS VARCHAR) \
             FROM valuations WHERE vrm = ?",
            [&vrm],
            |row| {
                Ok(ValuationRow {
                    vrm: row.get(0)?,
                    lowest_value: row.get(1)?,
                    highest_value: row.get(2)?,
                    provider: row.get(3)?,
                    created_at: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                })
            },
        );

        match result {
            Ok(row) => Ok(Some(row)),
            Err(::duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    /// Insert a valuation, failing with [`StoreError::UniqueViolation`] when
    /// a row for the VRM already exists.
    ///
    /// # Errors
    /// Returns `UniqueViolation` on a key collision and a database error for
    /// anything else.
    pub fn insert_valuation(&self, row: &ValuationRow) -> Result<(), StoreError> {
        let connection = self.manager.acquire()?;
        let params: [&dyn ToSql; 5] = [
            &row.vrm,
            &row.lowest_value,
            &row.highest_value,
            &row.provider,
            &row.created_at,
        ];
        let changed = connection.execute(
            "INSERT INTO valuations (vrm, lowest_value, highest_value, provider, created_at) \
             VALUES (?, ?, ?, ?, TRY_CAST(? AS TIMESTAMP)) \
             ON CONFLICT (vrm) DO NOTHING",
            params.as_slice(),
        )?;

        if changed == 0 {
            return Err(StoreError::UniqueViolation {
                vrm: row.vrm.clone(),
            });
        }
        Ok(())
    }

    /// Append a provider call log row. Every invocation produces exactly one
    /// row; the caller decides whether a persistence failure matters.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn insert_provider_log(&self, row: &ProviderLogRow) -> Result<(), StoreError> {
        let connection = self.manager.acquire()?;
        let params: [&dyn ToSql; 8] = [
            &row.id,
            &row.vrm,
            &row.provider,
            &row.url,
            &row.duration_ms,
            &row.status_code,
            &row.error_message,
            &row.timestamp,
        ];
        connection.execute(
            "INSERT INTO provider_logs \
             (id, vrm, provider, url, duration_ms, status_code, error_message, timestamp) \
             VALUES (?, ?, ?, ?, ?, ?, ?, TRY_CAST(? AS TIMESTAMP))",
            params.as_slice(),
        )?;
        Ok(())
    }

    /// List provider call logs for a VRM in call order.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn provider_logs_for(&self, vrm: &str) -> Result<Vec<ProviderLogRow>, StoreError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(
            "SELECT id, vrm, provider, url, duration_ms, status_code, error_message, \
                    CAST(timestamp AS VARCHAR) \
             FROM provider_logs WHERE vrm = ? ORDER BY timestamp, id",
        )?;
        let rows = statement
            .query_map([&vrm], |row| {
                Ok(ProviderLogRow {
                    id: row.get(0)?,
                    vrm: row.get(1)?,
                    provider: row.get(2)?,
                    url: row.get(3)?,
                    duration_ms: row.get(4)?,
                    status_code: row.get(5)?,
                    error_message: row.get(6)?,
                    timestamp: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// Resolve the motorval home directory from environment or default.
fn resolve_motorval_home() -> PathBuf {
    if let Some(path) = env::var_os("MOTORVAL_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".motorval");
    }

    PathBuf::from(".motorval")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_temp_store(temp: &tempfile::TempDir) -> ValuationStore {
        let motorval_home = temp.path().join("motorval-home");
        let db_path = motorval_home.join("valuations.duckdb");
        ValuationStore::open(StoreConfig {
            motorval_home,
            db_path,
            max_pool_size: 2,
        })
        .expect("store open")
    }

    fn sample_valuation(vrm: &str) -> ValuationRow {
        ValuationRow {
            vrm: vrm.to_owned(),
            lowest_value: 11_500.0,
            highest_value: 12_750.0,
            provider: Some(String::from("Super Car Valuations")),
            created_at: String::from("2026-02-20T10:00:00Z"),
        }
    }

    #[test]
    fn round_trips_a_valuation() {
        let temp = tempdir().expect("tempdir");
        let store = open_temp_store(&temp);

        store
            .insert_valuation(&sample_valuation("AB12CDE"))
            .expect("insert");

        let found = store
            .find_valuation("AB12CDE")
            .expect("find")
            .expect("row should exist");
        assert_eq!(found.vrm, "AB12CDE");
        assert_eq!(found.lowest_value, 11_500.0);
        assert_eq!(found.highest_value, 12_750.0);
        assert_eq!(found.provider.as_deref(), Some("Super Car Valuations"));
    }

    #[test]
    fn missing_vrm_returns_none() {
        let temp = tempdir().expect("tempdir");
        let store = open_temp_store(&temp);

        assert!(store.find_valuation("ZZ99ZZZ").expect("find").is_none());
    }

    #[test]
    fn duplicate_insert_is_a_unique_violation_and_keeps_first_row() {
        let temp = tempdir().expect("tempdir");
        let store = open_temp_store(&temp);

        store
            .insert_valuation(&sample_valuation("AB12CDE"))
            .expect("first insert");

        let mut second = sample_valuation("AB12CDE");
        second.lowest_value = 1.0;
        second.highest_value = 2.0;
        let error = store
            .insert_valuation(&second)
            .expect_err("second insert must fail");
        assert!(error.is_unique_violation());

        let found = store
            .find_valuation("AB12CDE")
            .expect("find")
            .expect("row should exist");
        assert_eq!(found.lowest_value, 11_500.0);
    }

    #[test]
    fn provider_logs_round_trip_in_call_order() {
        let temp = tempdir().expect("tempdir");
        let store = open_temp_store(&temp);

        let first = ProviderLogRow {
            id: String::from("log-1"),
            vrm: String::from("AB12CDE"),
            provider: String::from("Super Car Valuations"),
            url: String::from("https://supercar.example/valuations/AB12CDE?mileage=10000"),
            duration_ms: 42,
            status_code: Some(503),
            error_message: Some(String::from("super car valuations returned status 503")),
            timestamp: String::from("2026-02-20T10:00:00Z"),
        };
        let second = ProviderLogRow {
            id: String::from("log-2"),
            vrm: String::from("AB12CDE"),
            provider: String::from("Premium Car Valuations"),
            url: String::from("https://premiumcar.example/valuations/AB12CDE?mileage=10000"),
            duration_ms: 17,
            status_code: Some(200),
            error_message: None,
            timestamp: String::from("2026-02-20T10:00:01Z"),
        };
        store.insert_provider_log(&first).expect("insert first");
        store.insert_provider_log(&second).expect("insert second");

        let logs = store.provider_logs_for("AB12CDE").expect("logs");
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].id, "log-1");
        assert_eq!(logs[0].status_code, Some(503));
        assert_eq!(logs[1].id, "log-2");
        assert!(logs[1].error_message.is_none());

        assert!(store.provider_logs_for("ZZ99ZZZ").expect("logs").is_empty());
    }

    #[test]
    fn legacy_row_with_null_provider_reads_back_as_none() {
        let temp = tempdir().expect("tempdir");
        let store = open_temp_store(&temp);

        let mut row = sample_valuation("OLD1");
        row.provider = None;
        store.insert_valuation(&row).expect("insert");

        let found = store
            .find_valuation("OLD1")
            .expect("find")
            .expect("row should exist");
        assert!(found.provider.is_none());
    }
}
