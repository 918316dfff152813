pub mod sled_store;

use ledger_core::{Chain, ChainConfig, Result};
use sled_store::SledStore;
use std::path::Path;
use std::sync::Arc;

/// Creates a new chain in `data_dir`, rewarding `reward_address` in the genesis block.
///
/// Fails with `StoreAlreadyExists` if `data_dir` already holds a chain.
pub fn create_chain<P: AsRef<Path>>(
    data_dir: P,
    reward_address: &str,
    config: ChainConfig,
) -> Result<Chain<SledStore>> {
    let store = Arc::new(SledStore::open(data_dir)?);
    Chain::create(store, reward_address, config)
}

/// Opens the chain in `data_dir`. Fails with `StoreNotFound` if there is none,
/// without leaving an empty database behind.
pub fn open_chain<P: AsRef<Path>>(data_dir: P, config: ChainConfig) -> Result<Chain<SledStore>> {
    let store = Arc::new(SledStore::open_existing(data_dir)?);
    Chain::open(store, config)
}
