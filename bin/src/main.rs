//! tickscan CLI - Exchange ticker scanner and candle builder.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tickscan_daemon::DEFAULT_CONFIG_FILE;

mod commands;
mod logging;

use logging::LogSettings;

#[derive(Parser)]
#[command(name = "tickscan")]
#[command(about = "Polls exchange tickers and builds OHLC candles", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scanner until interrupted
    Run {
        /// Configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },

    /// Validate a configuration file and print a summary
    Check {
        /// Configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },

    /// Fetch one ticker snapshot and print it
    Tickers {
        /// Exchange (binance, bybit, okx, bitget)
        exchange: String,

        /// Only show symbols containing this text
        #[arg(short, long)]
        filter: Option<String>,

        /// Maximum rows to print
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// List supported candle intervals
    Intervals,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let log = LogSettings::from_flags(cli.verbose, cli.quiet);

    match command {
        Commands::Run { config } => commands::run::run(&config, log).await,
        Commands::Check { config } => {
            let _guard = logging::init(&log)?;
            commands::check::check(&config)
        }
        Commands::Tickers {
            exchange,
            filter,
            limit,
        } => {
            let _guard = logging::init(&log)?;
            commands::tickers::tickers(&exchange, filter.as_deref(), limit).await
        }
        Commands::Intervals => commands::intervals::list_intervals(),
    }
}
