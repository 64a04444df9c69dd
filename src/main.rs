//! Swap Sender CLI
//!
//! Runs single swaps through the configured swap API and reports the
//! resulting signature or classified failure.

// Compiler warning configuration
#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(dead_code)]
#![warn(unused_must_use)]

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use solana_sdk::pubkey::Pubkey;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use swap_sender::config::Config;
use swap_sender::rpc_manager::connect;
use swap_sender::tx_builder::NATIVE_MINT;
use swap_sender::wallet::WalletManager;
use swap_sender::SwapExecutor;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Swap `amount` of one token into another
    Swap {
        /// Input mint, defaults to native SOL
        #[arg(long, default_value_t = NATIVE_MINT)]
        from: Pubkey,

        /// Output mint
        #[arg(long)]
        to: Pubkey,

        /// Amount of the input token, in whole tokens
        #[arg(long)]
        amount: f64,
    },

    /// Print the wallet's balance of a token
    Balance {
        #[arg(long)]
        mint: Pubkey,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose)?;

    info!("Starting swap-sender v{}", env!("CARGO_PKG_VERSION"));
    info!("Loading configuration from: {}", args.config);
    let config = load_config(&args.config)?;

    let wallet = load_wallet(&config)?;
    info!("Wallet address: {}", wallet.pubkey());

    if config.auxiliary_transfer.enabled {
        warn!(
            recipient = ?config.auxiliary_transfer.recipient,
            scale_factor = config.auxiliary_transfer.scale_factor,
            "Auxiliary transfer enabled: every swap also transfers SOL out of this wallet"
        );
    }

    let rpc = connect(
        &config.rpc.url,
        Duration::from_secs(config.rpc.timeout_secs),
        config.submission.commitment,
    );
    let executor = SwapExecutor::from_config(&config, rpc).context("Failed to build swap client")?;

    match args.command {
        Command::Swap { from, to, amount } => {
            let shutdown = async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received shutdown signal");
                }
            };
            match executor
                .perform_swap_until(&from, &to, amount, wallet.keypair(), shutdown)
                .await
            {
                Ok(signature) => info!("Swap sent: {}", signature),
                Err(e) => {
                    error!(
                        category = e.category(),
                        retryable = e.is_retryable(),
                        "Swap failed: {}",
                        e
                    );
                    return Err(e.into());
                }
            }
        }
        Command::Balance { mint } => {
            let balance = executor
                .token_balance(&wallet.pubkey(), &mint)
                .await
                .context("Failed to read token balance")?;
            match balance {
                Some(amount) => info!("Balance of {}: {}", mint, amount),
                None => info!("No token account for {}", mint),
            }
        }
    }

    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        "swap_sender=debug,info"
    } else {
        "swap_sender=info,warn,error"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path))
    } else {
        warn!("Config file '{}' not found, using defaults", path);
        Config::default_with_env().context("Invalid environment overrides")
    }
}

/// `SWAP_PRIVATE_KEY` (base58) wins over the configured keypair file
fn load_wallet(config: &Config) -> Result<WalletManager> {
    if let Ok(secret) = std::env::var("SWAP_PRIVATE_KEY") {
        return WalletManager::from_base58(&secret).context("Invalid SWAP_PRIVATE_KEY");
    }
    let path = config
        .wallet
        .keypair_path
        .as_deref()
        .context("No wallet configured: set wallet.keypair_path or SWAP_PRIVATE_KEY")?;
    info!("Initializing wallet from: {}", path);
    WalletManager::from_file(path).context("Failed to load wallet")
}
