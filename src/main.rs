//! Smart-Wallet Demo Client - custodial wallet CLI for Solana devnet
//!
//! # WARNING
//! - This is a devnet demo. Do not point it at mainnet funds.
//! - The hosted platform holds custody of the smart wallet; this client
//!   only approves actions with the local admin keypair.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

// Use the library crate
use smartwallet::cli::commands;
use smartwallet::config::Config;

/// Smart-wallet demo client
#[derive(Parser)]
#[command(name = "smartwallet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect the signing wallet and resolve the smart wallet
    Connect,

    /// Show local session and delegated-keypair state
    Status,

    /// Fetch current balances once
    Balance,

    /// Poll balances continuously, printing changes
    Watch,

    /// Transfer funds from the smart wallet
    Transfer {
        /// Token to send: sol or usdc
        token: String,

        /// Recipient wallet address
        recipient: String,

        /// Amount in whole tokens
        amount: f64,
    },

    /// Delegated-signer management
    Signer {
        #[command(subcommand)]
        action: SignerAction,
    },

    /// Show the platform's transaction history for the wallet
    History {
        /// Number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Request a devnet airdrop to the smart wallet
    Airdrop {
        /// Amount in SOL
        #[arg(default_value = "1.0")]
        amount_sol: f64,
    },

    /// Show current configuration (secrets masked)
    Config,

    /// Check platform and RPC connectivity
    Health,
}

#[derive(Subcommand)]
enum SignerAction {
    /// List delegated signers registered on the wallet
    List,

    /// Register a delegated signer (defaults to the generated keypair)
    Add {
        /// Signer address; omit to use the generated keypair
        address: Option<String>,
    },

    /// Generate a local delegated-signer keypair
    Generate,

    /// Remove the local delegated-signer keypair
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("smartwallet=info".parse().unwrap()),
        )
        .with_target(true)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Fail fast when the hosted-service credential is missing; this is
    // not user-recoverable at runtime
    if let Err(e) = config.require_api_key() {
        error!("Startup check failed: {}", e);
        std::process::exit(1);
    }

    // Execute command
    let result = match cli.command {
        Commands::Connect => commands::connect(&config).await,
        Commands::Status => commands::status(&config).await,
        Commands::Balance => commands::balance(&config).await,
        Commands::Watch => commands::watch(&config).await,
        Commands::Transfer {
            token,
            recipient,
            amount,
        } => commands::transfer(&config, &token, &recipient, amount).await,
        Commands::Signer { action } => match action {
            SignerAction::List => commands::signer_list(&config).await,
            SignerAction::Add { address } => commands::signer_add(&config, address).await,
            SignerAction::Generate => commands::signer_generate(&config).await,
            SignerAction::Clear => commands::signer_clear(&config).await,
        },
        Commands::History { limit } => commands::history(&config, limit).await,
        Commands::Airdrop { amount_sol } => commands::airdrop(&config, amount_sol).await,
        Commands::Config => commands::show_config(&config),
        Commands::Health => commands::health(&config).await,
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
