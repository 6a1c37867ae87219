//! CLI argument definitions for Motorval.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `value` | Fetch (or reuse) a valuation for a VRM |
//! | `lookup` | Read a stored valuation without calling upstreams |
//! | `logs` | Show provider call logs recorded for a VRM |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--db-path` | `$MOTORVAL_HOME/valuations.duckdb` | Valuation database file |
//! | `--pretty` | `false` | Pretty-print JSON output |
//!
//! # Examples
//!
//! ```bash
//! # Value a vehicle (idempotent per VRM)
//! motorval value AB12CDE --mileage 10000
//!
//! # Re-read without touching the providers
//! motorval lookup AB12CDE
//!
//! # Inspect upstream call history
//! motorval logs AB12CDE
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Motorval - failover vehicle valuation CLI
///
/// Values a vehicle through the Super Car Valuations upstream, failing over
/// to Premium Car Valuations behind a circuit breaker, and persists every
/// result so each VRM is valued exactly once.
#[derive(Debug, Parser)]
#[command(
    name = "motorval",
    author,
    version,
    about = "Failover vehicle valuation CLI"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the valuation database file.
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Pretty-print JSON output.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch a valuation for a VRM, calling upstreams only on first request.
    Value {
        /// Vehicle registration mark, e.g. AB12CDE.
        vrm: String,

        /// Current vehicle mileage; must be positive.
        #[arg(long)]
        mileage: u32,
    },

    /// Read a stored valuation; exits non-zero when none exists.
    Lookup {
        /// Vehicle registration mark.
        vrm: String,
    },

    /// Show provider call logs recorded for a VRM, oldest first.
    Logs {
        /// Vehicle registration mark.
        vrm: String,
    },
}
