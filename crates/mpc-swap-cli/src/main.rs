//! MPC Swap CLI
//!
//! Command-line tool for inspecting and simulating the trade handshake.

use alloy_primitives::{Address, U256};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mpc_swap_core::{
    HandshakeStep, Offer, OfferBook, SessionConfig, TradeContext,
    chain::{ChainId, MemoryChain},
    run_initiator, run_responder,
    transport::loopback,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "mpc-swap")]
#[command(about = "Two-party threshold-ECDSA trade handshake", version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version, protocol identifiers and the handshake layout
    Info,

    /// Compute the hash identifying an offer
    OfferHash {
        #[arg(long)]
        gives_token: Address,
        #[arg(long)]
        gives_amount: U256,
        #[arg(long)]
        gets_token: Address,
        #[arg(long)]
        gets_amount: U256,
        #[arg(long)]
        maker: Address,
    },

    /// Run a complete two-party trade against an in-memory chain
    Simulate {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

/// Settings read from the configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct CliConfig {
    session: SessionConfig,
    simulation: SimulationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct SimulationConfig {
    chain_id: u64,
    gas_price_wei: u64,
    gas_estimate: u64,
    /// Starting balance of the simulated taker account
    taker_balance_wei: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            chain_id: ChainId::LOCAL.0,
            gas_price_wei: 1_000_000_000,
            gas_estimate: 250_000,
            taker_balance_wei: 1_000_000_000_000_000_000,
        }
    }
}

impl CliConfig {
    fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: CliConfig =
            toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        config.session.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .init();

    let config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Info => {
            show_info(&config);
        }
        Commands::OfferHash {
            gives_token,
            gives_amount,
            gets_token,
            gets_amount,
            maker,
        } => {
            let offer = Offer::new(gives_token, gives_amount, gets_token, gets_amount, maker);
            println!("{}", offer.hash());
        }
        Commands::Simulate { format } => {
            simulate(&config, &format).await?;
        }
    }

    Ok(())
}

fn show_info(config: &CliConfig) {
    println!("MPC Swap v{}", mpc_swap_core::VERSION);
    println!();
    println!("Protocols:");
    println!("  Offer list:   {}", mpc_swap_core::ORDERS_PROTOCOL);
    println!("  Create trade: {}", mpc_swap_core::CREATE_TRADE_PROTOCOL);
    println!();
    println!("Handshake:");
    for step in HandshakeStep::ALL {
        println!(
            "  {}. {:<10} {} -> {}",
            step.position(),
            step.to_string(),
            step.sender(),
            step.sender().counterparty()
        );
    }
    println!();
    println!("Session:");
    println!("  Bootstrap funding: {} wei", config.session.bootstrap_funding);
    println!("  Max frame length:  {} bytes", config.session.max_frame_len);
    match config.session.inbound_timeout_ms {
        Some(ms) => println!("  Inbound timeout:   {} ms", ms),
        None => println!("  Inbound timeout:   none"),
    }
}

async fn simulate(config: &CliConfig, format: &str) -> Result<()> {
    let sim = &config.simulation;
    info!(chain_id = sim.chain_id, "Running in-process trade simulation...");

    let chain = MemoryChain::new(sim.chain_id)
        .with_gas_price(U256::from(sim.gas_price_wei))
        .with_gas_estimate(sim.gas_estimate);

    let maker = Address::repeat_byte(0x4d);
    let taker = Address::repeat_byte(0x54);
    chain.set_balance(taker, U256::from(sim.taker_balance_wei));

    let offer = Offer::new(
        Address::repeat_byte(0x0a),
        U256::from(100u64),
        Address::repeat_byte(0x0b),
        U256::from(50u64),
        maker,
    );
    let book = OfferBook::new();
    book.list(offer.clone());

    let provider = Arc::new(chain.clone());
    let taker_ctx = TradeContext::new(provider.clone(), Arc::new(chain.wallet(taker)))
        .with_config(config.session.clone());
    let maker_ctx = TradeContext::new(provider, Arc::new(chain.wallet(maker)))
        .with_config(config.session.clone());

    let (initiator_stream, responder_stream) = loopback(64 * 1024);
    let (initiator, responder) = tokio::try_join!(
        run_initiator(&taker_ctx, initiator_stream, &offer),
        run_responder(&maker_ctx, responder_stream, &book),
    )?;

    let signer = initiator.transaction.recover_signer()?;

    if format == "json" {
        let output = serde_json::json!({
            "offer_hash": initiator.offer_hash.to_string(),
            "funding_address": initiator.funding_address,
            "responder_funding_address": responder.funding_address,
            "tx_hash": initiator.tx_hash,
            "recovered_signer": signer,
            "transaction": initiator.transaction,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("\nTrade completed successfully!\n");
        println!("Offer Hash:        {}", initiator.offer_hash);
        println!("Funding Address:   {}", initiator.funding_address);
        println!(
            "Responder Agrees:  {}",
            initiator.funding_address == responder.funding_address
        );
        println!("Transaction Hash:  {}", initiator.tx_hash);
        println!("Recovered Signer:  {}", signer);
        println!("Swept Value:       {} wei", initiator.transaction.value);
        println!("Broadcasts:        {}", chain.broadcasts().len());
    }

    Ok(())
}
