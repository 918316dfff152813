mod api;
mod constants;

use api::AppState;
use clap::Parser;
use constants::{DEFAULT_LISTEN, DEFAULT_MINING_TIMEOUT_SECS};
use ledger_core::constants::POW_TARGET_DIFFICULTY;
use ledger_core::{ChainConfig, LedgerError};
use ledger_storage::{create_chain, open_chain};
use std::net::SocketAddr;
use tracing::{info, Level};

#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long, default_value = DEFAULT_LISTEN)]
    listen: String,

    /// Data directory for sled
    #[arg(long, env = "LEDGER_DATA_DIR", default_value = "./data")]
    data_dir: String,

    /// Leading zero bits required of a block hash
    #[arg(long, env = "LEDGER_DIFFICULTY_BITS", default_value_t = POW_TARGET_DIFFICULTY)]
    difficulty_bits: u32,

    /// Search nonces on all cores
    #[arg(long)]
    parallel: bool,

    /// Give up mining a transfer after this many seconds
    #[arg(long, default_value_t = DEFAULT_MINING_TIMEOUT_SECS)]
    mining_timeout: u64,

    /// Create the chain on startup, paying the genesis reward to this address
    #[arg(long)]
    create_with_reward: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = ChainConfig {
        difficulty_bits: args.difficulty_bits,
        parallel_mining: args.parallel,
        mining_timeout_secs: Some(args.mining_timeout),
        ..ChainConfig::default()
    };

    let chain = match &args.create_with_reward {
        Some(address) => match create_chain(&args.data_dir, address, config.clone()) {
            Err(LedgerError::StoreAlreadyExists) => {
                info!("chain already present in {}, opening it", args.data_dir);
                open_chain(&args.data_dir, config)?
            }
            other => other?,
        },
        None => open_chain(&args.data_dir, config)?,
    };

    let app = api::router(AppState::new(chain));

    let addr: SocketAddr = args.listen.parse()?;
    info!("ledger-node listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}
