//! Cache module for API responses
//!
//! This module provides a time-boxed cache that keeps fetched data for a fixed
//! window and throttles operator-triggered refreshes with a per-key cooldown.
//! Entries are persisted through a pluggable [`Store`], either in memory or as
//! JSON files in the user's cache directory.

mod clock;
mod store;
mod timed;

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{FileStore, MemoryStore, Store, StoreError};
pub use timed::{CacheEntry, EntryStatus, TimedCache};
