use clap::{Parser, Subcommand};

use band_trade_bybit::BybitVenue;
use band_trade_core::{AppConfig, ConfigLoader};
use band_trade_engine::TradeEngine;
use band_trade_scanner::ScanRunner;

#[derive(Parser)]
#[command(name = "band-trade")]
#[command(about = "Band trading engine for Bybit USDT perpetuals", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trade one configured symbol through the order lifecycle engine
    Run {
        /// Config profile merged over config/Config.toml (e.g. "testnet")
        #[arg(short, long)]
        profile: Option<String>,
    },
    /// Scan the watch list and trade the widest-bandwidth setup
    Scan {
        /// Config profile merged over config/Config.toml (e.g. "testnet")
        #[arg(short, long)]
        profile: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { profile } => {
            let config = load_config(profile.as_deref())?;
            run_engine(config).await
        }
        Commands::Scan { profile } => {
            let config = load_config(profile.as_deref())?;
            run_scanner(config).await
        }
    }
}

fn load_config(profile: Option<&str>) -> anyhow::Result<AppConfig> {
    let config = match profile {
        Some(profile) => ConfigLoader::load_with_profile(profile)?,
        None => ConfigLoader::load()?,
    };

    if config.bybit.api_key.is_empty() {
        tracing::warn!("no API key configured; signed venue calls will fail");
    }
    tracing::info!("venue endpoint: {}", config.bybit.api_url);

    Ok(config)
}

async fn run_engine(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!("starting lifecycle engine for {}", config.engine.symbol);

    let venue = BybitVenue::from_config(&config.bybit)?;
    let mut engine = TradeEngine::start(venue, &config).await?;
    engine.run().await
}

async fn run_scanner(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!("starting watch-list scanner");

    let venue = BybitVenue::from_config(&config.bybit)?;
    let mut runner = ScanRunner::new(venue, config)?;
    runner.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_accepts_profile() {
        let cli = Cli::parse_from(["band-trade", "run", "--profile", "testnet"]);
        match cli.command {
            Commands::Run { profile } => assert_eq!(profile.as_deref(), Some("testnet")),
            Commands::Scan { .. } => panic!("expected run command"),
        }
    }

    #[test]
    fn test_scan_defaults_to_no_profile() {
        let cli = Cli::parse_from(["band-trade", "scan"]);
        match cli.command {
            Commands::Scan { profile } => assert!(profile.is_none()),
            Commands::Run { .. } => panic!("expected scan command"),
        }
    }
}
