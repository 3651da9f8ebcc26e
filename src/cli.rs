//! Command-line interface parsing for ratewatch
//!
//! This module handles parsing of CLI arguments using clap, and the errors a
//! command can end with.

use chrono::Duration;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

use crate::config::{ApiConfig, CacheConfig, DEFAULT_API_URL};
use crate::rates::RatesError;

/// Error types for running a command
#[derive(Debug, Error)]
pub enum CliError {
    /// The amount argument is not a non-negative number
    #[error("Invalid amount: '{0}'. Expected a non-negative number such as 100 or 99.90")]
    InvalidAmount(String),

    /// A manual refresh was requested before the cooldown ran out
    #[error("Manual refresh is on cooldown. Wait {}m{}s before refreshing again", .remaining_secs / 60, .remaining_secs % 60)]
    CooldownActive { remaining_secs: u64 },

    /// No conversion route exists between the two currencies
    #[error("No exchange route from {from} to {to}")]
    NoRoute { from: String, to: String },

    /// The platform cache directory could not be determined
    #[error("Could not determine a cache directory; pass --cache-dir")]
    NoCacheDir,

    /// Fetching the rate table failed
    #[error(transparent)]
    Rates(#[from] RatesError),
}

/// ratewatch - exchange rates with a local cache
#[derive(Parser, Debug)]
#[command(name = "ratewatch")]
#[command(about = "Exchange rates and currency conversion with a local cache")]
#[command(version)]
pub struct Cli {
    /// Base URL of the market-data API (`/api` is appended when missing)
    #[arg(long, env = "RATEWATCH_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Directory for cached responses (defaults to the user cache directory)
    #[arg(long, env = "RATEWATCH_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// How long fetched data stays valid, in seconds
    #[arg(long, env = "RATEWATCH_CACHE_TTL_SECS", default_value_t = 3600)]
    pub cache_ttl_secs: u32,

    /// Minimum time between manual refreshes, in seconds
    #[arg(long, env = "RATEWATCH_REFRESH_COOLDOWN_SECS", default_value_t = 300)]
    pub refresh_cooldown_secs: u32,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Convert an amount between two currencies
    ///
    /// Examples:
    ///   ratewatch convert 100 USD BRL
    ///   ratewatch convert 250.50 EUR ARS --refresh
    Convert {
        /// Amount to convert
        amount: String,
        /// Source currency code, e.g. USD
        from: String,
        /// Destination currency code, e.g. BRL
        to: String,
        /// Fetch fresh rates instead of using the cache
        #[arg(long)]
        refresh: bool,
    },
    /// List the quoted exchange pairs
    Rates {
        /// Fetch fresh rates instead of using the cache
        #[arg(long)]
        refresh: bool,
    },
    /// List the supported currencies
    Currencies,
    /// Show the age of the cached rate table and the refresh cooldown
    Status,
    /// Remove every cached response
    ClearCache,
}

impl Cli {
    /// Cache settings derived from the command line
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::default()
            .with_cache_duration(Duration::seconds(i64::from(self.cache_ttl_secs)))
            .with_manual_refresh_cooldown(Duration::seconds(i64::from(self.refresh_cooldown_secs)))
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig::new(&self.api_url)
    }
}

/// Parses an amount argument.
///
/// Accepts `.` or `,` as the decimal separator.
///
/// # Returns
/// * `Ok(f64)` for a finite, non-negative number
/// * `Err(CliError::InvalidAmount)` otherwise
pub fn parse_amount(s: &str) -> Result<f64, CliError> {
    let normalized = s.trim().replace(',', ".");
    normalized
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite() && *amount >= 0.0)
        .ok_or_else(|| CliError::InvalidAmount(s.to_string()))
}
