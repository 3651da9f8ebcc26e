//! ratewatch library
//!
//! A time-boxed cache with cooldown-gated manual refresh, and exchange-rate
//! resolution across sparse pair tables. The `ratewatch` binary and the
//! integration tests build on these modules.

pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod rates;
