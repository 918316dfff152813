use crate::block::Block;
use crate::config::ChainConfig;
use crate::constants::GENESIS_COINBASE_DATA;
use crate::error::{LedgerError, Result};
use crate::pow::{self, CancelToken};
use crate::transaction::Transaction;
use crate::Hash;
use std::sync::Arc;
use tracing::info;

/// Trait the storage backends implement for the chain to operate.
/// This lives in `ledger-core` to avoid a circular dependency.
///
/// Blocks are keyed by their own hash; the tip is a separate pointer. Both
/// writing methods must apply the block and the tip together or not at all.
pub trait ChainStore: Send + Sync {
    /// Hash of the most recently appended block, `None` for an empty store.
    fn tip(&self) -> Result<Option<Hash>>;

    fn get_block(&self, hash: &Hash) -> Result<Option<Block>>;

    /// Records `genesis` as the only block and the tip.
    /// Fails with `StoreAlreadyExists` if a tip is already recorded.
    fn init_genesis(&self, genesis: &Block) -> Result<()>;

    /// Writes `block` and moves the tip to it. Fails with `TipMoved` if the
    /// current tip is not the block's parent, and with `StoreAlreadyExists`
    /// for a block without a parent (genesis goes through `init_genesis`).
    fn append(&self, block: &Block) -> Result<()>;

    fn flush(&self) -> Result<()>;
}

/// Chain façade that delegates persistence to a `ChainStore`.
#[derive(Clone)]
pub struct Chain<S: ChainStore> {
    store: Arc<S>,
    config: ChainConfig,
}

/// Outcome of re-checking one stored block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockCheck {
    pub hash: Hash,
    pub pow_valid: bool,
    /// The record stored under `hash` carries `hash` as its own hash.
    pub key_matches: bool,
    pub txids_valid: bool,
}

impl BlockCheck {
    pub fn is_ok(&self) -> bool {
        self.pow_valid && self.key_matches && self.txids_valid
    }
}

impl<S: ChainStore> Chain<S> {
    /// Starts a new chain whose genesis block pays the subsidy to `reward_address`.
    pub fn create(store: Arc<S>, reward_address: &str, config: ChainConfig) -> Result<Self> {
        if store.tip()?.is_some() {
            return Err(LedgerError::StoreAlreadyExists);
        }
        let coinbase = Transaction::coinbase(reward_address, GENESIS_COINBASE_DATA, config.subsidy);
        let genesis = Block::genesis(coinbase, &config, &cancel_token(&config))?;
        store.init_genesis(&genesis)?;
        store.flush()?;
        info!(
            "created chain with genesis {} rewarding {}",
            hex::encode(genesis.hash()),
            reward_address
        );
        Ok(Self { store, config })
    }

    /// Opens a chain that already has a genesis block.
    pub fn open(store: Arc<S>, config: ChainConfig) -> Result<Self> {
        match store.tip()? {
            Some(tip) => {
                info!("opened chain at tip {}", hex::encode(tip));
                Ok(Self { store, config })
            }
            None => Err(LedgerError::StoreNotFound),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn tip(&self) -> Result<Hash> {
        self.store.tip()?.ok_or(LedgerError::StoreNotFound)
    }

    /// Fresh cursor positioned at the current tip.
    pub fn iter(&self) -> Result<ChainIter<S>> {
        Ok(ChainIter {
            store: Arc::clone(&self.store),
            current: Some(self.tip()?),
        })
    }

    /// Number of blocks, genesis included.
    pub fn height(&self) -> Result<usize> {
        let mut count = 0;
        for block in self.iter()? {
            block?;
            count += 1;
        }
        Ok(count)
    }

    /// Mines `transactions` on top of the tip and appends the block.
    pub fn mine_block(&self, transactions: Vec<Transaction>) -> Result<Block> {
        self.mine_block_with(transactions, &cancel_token(&self.config))
    }

    pub fn mine_block_with(
        &self,
        transactions: Vec<Transaction>,
        cancel: &CancelToken,
    ) -> Result<Block> {
        let tip = self.tip()?;
        let block = Block::mine(transactions, Some(tip), &self.config, cancel)?;
        self.store.append(&block)?;
        self.store.flush()?;
        Ok(block)
    }

    pub fn validate(&self, block: &Block) -> bool {
        pow::validate(block, self.config.difficulty_bits)
    }

    /// Walks the whole chain and re-checks every block, newest first.
    pub fn verify(&self) -> Result<Vec<BlockCheck>> {
        let mut checks = Vec::new();
        let mut current = Some(self.tip()?);
        while let Some(key) = current {
            let block = self
                .store
                .get_block(&key)?
                .ok_or(LedgerError::MissingBlock(key))?;
            checks.push(BlockCheck {
                hash: key,
                pow_valid: self.validate(&block),
                key_matches: block.hash() == &key,
                txids_valid: block.transactions().iter().all(Transaction::has_valid_id),
            });
            current = block.prev_block_hash().copied();
        }
        Ok(checks)
    }
}

fn cancel_token(config: &ChainConfig) -> CancelToken {
    config
        .mining_timeout()
        .map(CancelToken::with_timeout)
        .unwrap_or_default()
}

/// Backward cursor from a tip to the genesis block.
///
/// Each step reads the block under the current hash and moves to its parent.
/// The sequence ends after the genesis block; a new cursor restarts from the tip.
pub struct ChainIter<S: ChainStore> {
    store: Arc<S>,
    current: Option<Hash>,
}

impl<S: ChainStore> Iterator for ChainIter<S> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        let hash = self.current.take()?;
        match self.store.get_block(&hash) {
            Ok(Some(block)) => {
                self.current = block.prev_block_hash().copied();
                Some(Ok(block))
            }
            Ok(None) => Some(Err(LedgerError::MissingBlock(hash))),
            Err(e) => Some(Err(e)),
        }
    }
}
