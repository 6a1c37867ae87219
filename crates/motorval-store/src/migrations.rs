//! Schema migrations for the valuation store.

use ::duckdb::Connection;

/// Apply all schema migrations. Statements are idempotent so reopening an
/// existing database is safe.
///
/// # Errors
/// Returns an error if a migration statement fails to execute.
pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS valuations (
            vrm VARCHAR PRIMARY KEY,
            lowest_value DOUBLE NOT NULL,
            highest_value DOUBLE NOT NULL,
            provider VARCHAR,
            created_at TIMESTAMP
        );
        CREATE TABLE IF NOT EXISTS provider_logs (
            id VARCHAR PRIMARY KEY,
            vrm VARCHAR NOT NULL,
            provider VARCHAR NOT NULL,
            url VARCHAR NOT NULL,
            duration_ms BIGINT NOT NULL,
            status_code INTEGER,
            error_message VARCHAR,
            timestamp TIMESTAMP
        );",
    )
}
