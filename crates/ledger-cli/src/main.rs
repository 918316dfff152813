use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use ledger_core::constants::POW_TARGET_DIFFICULTY;
use ledger_core::ChainConfig;
use ledger_storage::{create_chain, open_chain};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "Command-line front end for the local proof-of-work ledger")]
struct Cli {
    #[command(flatten)]
    opts: ChainOpts,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args, Debug)]
struct ChainOpts {
    /// Data directory for sled
    #[arg(long, global = true, env = "LEDGER_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    /// Leading zero bits required of a block hash
    #[arg(long, global = true, env = "LEDGER_DIFFICULTY_BITS", default_value_t = POW_TARGET_DIFFICULTY)]
    difficulty_bits: u32,

    /// Search nonces on all cores
    #[arg(long, global = true)]
    parallel: bool,

    /// Give up mining after this many seconds
    #[arg(long, global = true)]
    mining_timeout: Option<u64>,
}

impl ChainOpts {
    fn config(&self) -> ChainConfig {
        ChainConfig {
            difficulty_bits: self.difficulty_bits,
            parallel_mining: self.parallel,
            mining_timeout_secs: self.mining_timeout,
            ..ChainConfig::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a chain and send the genesis reward to an address
    CreateChain {
        #[arg(long)]
        address: String,
    },
    /// Show the balance of an address
    Balance {
        #[arg(long)]
        address: String,
    },
    /// Send coins and mine a block holding the transfer
    Send {
        /// Sender
        #[arg(long)]
        from: String,
        /// Recipient
        #[arg(long)]
        to: String,
        /// Amount
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        amount: u64,
    },
    /// Print every block, newest first
    PrintChain,
    /// Re-check proof of work and record integrity of every block
    Verify,
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.opts.config();
    let data_dir = &cli.opts.data_dir;

    match cli.cmd {
        Command::CreateChain { address } => {
            let chain = create_chain(data_dir, &address, config)?;
            info!(tip = %hex::encode(chain.tip()?), "chain created");
            println!("Created!");
        }
        Command::Balance { address } => {
            let chain = open_chain(data_dir, config)?;
            let balance = chain.balance(&address)?;
            println!("Balance of {address}: {balance}");
        }
        Command::Send { from, to, amount } => {
            let chain = open_chain(data_dir, config)?;
            let block = chain.transfer(&from, &to, amount)?;
            info!(hash = %hex::encode(block.hash()), "transfer mined");
            println!("Success!");
        }
        Command::PrintChain => {
            let chain = open_chain(data_dir, config)?;
            for block in chain.iter()? {
                let block = block?;
                let prev = block.prev_block_hash().map(hex::encode).unwrap_or_default();
                println!("Prev. hash: {prev}");
                println!("Hash: {}", hex::encode(block.hash()));
                println!("Nonce: {}", block.nonce());
                println!("Transactions: {}", block.transactions().len());
                println!("PoW: {}", chain.validate(&block));
                println!();
            }
        }
        Command::Verify => {
            let chain = open_chain(data_dir, config)?;
            let checks = chain.verify()?;
            let bad: Vec<_> = checks.iter().filter(|c| !c.is_ok()).collect();
            for check in &bad {
                println!(
                    "{}: pow={} key={} txids={}",
                    hex::encode(check.hash),
                    check.pow_valid,
                    check.key_matches,
                    check.txids_valid
                );
            }
            if !bad.is_empty() {
                anyhow::bail!("{} of {} blocks failed verification", bad.len(), checks.len());
            }
            println!("{} blocks verified", checks.len());
        }
    }
    Ok(())
}
