//! Command execution
//!
//! `App` ties the rates client and its cache to the CLI commands and renders
//! each command's result as plain text.

use chrono::Duration;

use crate::cache::{Clock, Store, SystemClock};
use crate::cli::{parse_amount, CliError, Command};
use crate::rates::{
    all_currencies, get_currency, resolve_rate, RateTable, RatesClient, RATES_CACHE_KEY,
};

/// Runs CLI commands against a rates client
#[derive(Debug)]
pub struct App<S, C = SystemClock> {
    client: RatesClient<S, C>,
}

impl<S: Store, C: Clock> App<S, C> {
    pub fn new(client: RatesClient<S, C>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &RatesClient<S, C> {
        &self.client
    }

    /// Executes `command` and returns the text to print
    pub async fn run(&self, command: &Command) -> Result<String, CliError> {
        match command {
            Command::Convert {
                amount,
                from,
                to,
                refresh,
            } => {
                let amount = parse_amount(amount)?;
                let table = self.load_rates(*refresh).await?;
                convert_report(amount, from, to, &table)
            }
            Command::Rates { refresh } => {
                let table = self.load_rates(*refresh).await?;
                Ok(rates_report(&table))
            }
            Command::Currencies => Ok(currencies_report()),
            Command::Status => Ok(self.status_report()),
            Command::ClearCache => {
                self.client.cache().clear_all();
                Ok("Cache cleared".to_string())
            }
        }
    }

    /// Loads the rate table, enforcing the manual refresh cooldown
    async fn load_rates(&self, refresh: bool) -> Result<RateTable, CliError> {
        if refresh {
            let cache = self.client.cache();
            if !cache.can_manual_refresh_key(RATES_CACHE_KEY) {
                return Err(CliError::CooldownActive {
                    remaining_secs: cache.remaining_cooldown_secs_key(RATES_CACHE_KEY),
                });
            }
        }
        Ok(self.client.fetch_rates(refresh).await?)
    }

    fn status_report(&self) -> String {
        let Some(status) = self.client.cache().status(RATES_CACHE_KEY) else {
            return "No cached rate table".to_string();
        };

        let freshness = if status.is_valid {
            format!("valid for {}", format_duration(status.expires_in))
        } else {
            "expired".to_string()
        };
        let refresh = match status.remaining_cooldown_secs {
            0 => "manual refresh available".to_string(),
            secs => format!(
                "manual refresh available in {}",
                format_duration(Duration::seconds(secs as i64))
            ),
        };

        format!(
            "Rate table fetched {} ({} ago), {}\n{}",
            status.fetched_at.format("%Y-%m-%d %H:%M:%S UTC"),
            format_duration(status.age),
            freshness,
            refresh
        )
    }
}

fn convert_report(amount: f64, from: &str, to: &str, table: &RateTable) -> Result<String, CliError> {
    let rate = resolve_rate(from, to, table);
    if rate == 0.0 {
        return Err(CliError::NoRoute {
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    Ok(format!(
        "{} = {}\nRate: 1 {} = {:.6} {}",
        format_money(amount, from),
        format_money(amount * rate, to),
        from,
        rate,
        to
    ))
}

fn rates_report(table: &RateTable) -> String {
    if table.is_empty() {
        return "No exchange pairs available".to_string();
    }

    let mut keys: Vec<&String> = table.keys().collect();
    keys.sort();
    keys.iter()
        .map(|key| {
            let pair = &table[key.as_str()];
            format!("{:<10} {:>16.6}  {}", key, pair.rate(), pair.label)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn currencies_report() -> String {
    all_currencies()
        .iter()
        .map(|currency| format!("{:<5} {:<6} {}", currency.code, currency.symbol, currency.name))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Formats an amount with the currency's symbol when it is in the catalog
fn format_money(amount: f64, code: &str) -> String {
    match get_currency(code) {
        Some(currency) => format!("{} {:.2} ({})", currency.symbol, amount, code),
        None => format!("{:.2} {}", amount, code),
    }
}

/// Formats a duration as `1h02m`, `4m05s` or `42s`
fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}h{:02}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m{:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
