//! ratewatch - exchange rates and currency conversion from the command line
//!
//! Fetches the exchange-rate table from the market-data API, keeps it in a
//! local time-boxed cache and converts between any two quoted currencies.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ratewatch::app::App;
use ratewatch::cache::{FileStore, TimedCache};
use ratewatch::cli::{Cli, CliError};
use ratewatch::rates::RatesClient;

/// Installs the log subscriber. Logs go to stderr so stdout only carries
/// command output; verbosity comes from `RUST_LOG` (default `warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<String, CliError> {
    let store = match &cli.cache_dir {
        Some(dir) => FileStore::with_dir(dir.clone()),
        None => FileStore::new().ok_or(CliError::NoCacheDir)?,
    };
    let cache = TimedCache::new(store, cli.cache_config());
    let app = App::new(RatesClient::new(cli.api_config(), cache));

    app.run(&cli.command).await
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
