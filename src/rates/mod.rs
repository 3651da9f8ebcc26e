//! Exchange-rate tables and cross-currency resolution
//!
//! Rate tables are sparse: the data source publishes one direction of a pair
//! and only pairs it actually quotes. [`resolve_rate`] fills the gaps by
//! inverting reverse quotes and by routing through the hub currencies USD and
//! BRL. A result of `0.0` means no route was found.

pub mod client;
pub mod currency;

pub use client::{RatesClient, RatesError, RATES_CACHE_KEY};
pub use currency::{all_currencies, get_currency, Currency};

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Intermediary currencies tried, in order, when no direct quote exists
pub const HUB_CURRENCIES: [&str; 2] = ["USD", "BRL"];

/// A quoted exchange pair as published by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatePair {
    /// Human-readable description, e.g. "Dólar Americano/Real Brasileiro"
    #[serde(default)]
    pub label: String,
    /// Units of the destination currency per unit of the source currency,
    /// kept as published
    #[serde(default, alias = "valor", deserialize_with = "deserialize_quote")]
    pub value: String,
}

impl RatePair {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    /// Numeric rate, or `0.0` when the published value is not a finite number
    pub fn rate(&self) -> f64 {
        self.value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|rate| rate.is_finite())
            .unwrap_or(0.0)
    }
}

/// Accepts quotes published either as strings or as bare JSON numbers
fn deserialize_quote<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(match raw {
        serde_json::Value::String(text) => text,
        serde_json::Value::Number(number) => number.to_string(),
        _ => String::new(),
    })
}

/// Rate table keyed by pair key (`"<FROM>_<TO>"`)
pub type RateTable = HashMap<String, RatePair>;

/// Builds the table key for a pair
pub fn pair_key(from: &str, to: &str) -> String {
    format!("{}_{}", from, to)
}

/// Effective multiplier converting one unit of `from` into `to`
///
/// Tries, in order: identity, a direct quote, the inverse of a reverse quote,
/// then a route through the first hub currency that is neither endpoint nor
/// already on the route. Returns `0.0` when nothing applies.
pub fn resolve_rate(from: &str, to: &str, table: &RateTable) -> f64 {
    resolve_via_hubs(from, to, table, &[])
}

fn resolve_via_hubs(from: &str, to: &str, table: &RateTable, route: &[&'static str]) -> f64 {
    if from == to {
        return 1.0;
    }

    if let Some(pair) = table.get(&pair_key(from, to)) {
        return pair.rate();
    }

    if let Some(pair) = table.get(&pair_key(to, from)) {
        let rate = pair.rate();
        return if rate == 0.0 { 0.0 } else { 1.0 / rate };
    }

    // A hub already on the route is skipped, which bounds the depth to the
    // number of hubs.
    let hub = HUB_CURRENCIES
        .iter()
        .copied()
        .find(|hub| from != *hub && to != *hub && !route.contains(hub));

    match hub {
        Some(hub) => {
            let mut next_route = route.to_vec();
            next_route.push(hub);
            resolve_via_hubs(from, hub, table, &next_route)
                * resolve_via_hubs(hub, to, table, &next_route)
        }
        None => 0.0,
    }
}

/// Converts `amount` of `from` into `to`, or `None` if the pair is unresolvable
pub fn convert(amount: f64, from: &str, to: &str, table: &RateTable) -> Option<f64> {
    let rate = resolve_rate(from, to, table);
    if rate == 0.0 {
        None
    } else {
        Some(amount * rate)
    }
}
