use anyhow::Context;
use ledger_core::constants::TIP_KEY;
use ledger_core::{Block, ChainStore, Hash, LedgerError, Result};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, IVec, Tree};
use std::path::Path;
use tracing::{debug, info};

const TREE_BLOCKS: &str = "blocks";

/// `ChainStore` on sled. One tree maps block hash to encoded block, plus the
/// reserved `TIP_KEY` entry pointing at the newest block.
#[derive(Clone)]
pub struct SledStore {
    db: Db,
    blocks: Tree,
}

impl SledStore {
    /// Opens the database at `path`, creating an empty one if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path)
            .with_context(|| format!("opening sled store at {}", path.display()))?;
        let blocks = db.open_tree(TREE_BLOCKS).map_err(backend)?;
        info!("sled store opened at {}", path.display());
        Ok(Self { db, blocks })
    }

    /// Opens a database that must already exist on disk.
    pub fn open_existing<P: AsRef<Path>>(path: P) -> Result<Self> {
        if !path.as_ref().exists() {
            return Err(LedgerError::StoreNotFound);
        }
        Self::open(path)
    }

    /// Drops every record, tip included.
    pub fn clear(&self) -> Result<()> {
        self.blocks.clear().map_err(backend)?;
        self.flush()
    }

    /// Number of stored blocks.
    pub fn block_count(&self) -> Result<usize> {
        let mut count = 0;
        for entry in self.blocks.iter() {
            let (key, _) = entry.map_err(backend)?;
            if key.as_ref() != TIP_KEY {
                count += 1;
            }
        }
        Ok(count)
    }
}

impl ChainStore for SledStore {
    fn tip(&self) -> Result<Option<Hash>> {
        self.blocks
            .get(TIP_KEY)
            .map_err(backend)?
            .map(|v| to_hash(&v))
            .transpose()
    }

    fn get_block(&self, hash: &Hash) -> Result<Option<Block>> {
        self.blocks
            .get(hash)
            .map_err(backend)?
            .map(|v: IVec| Block::deserialize(&v))
            .transpose()
    }

    fn init_genesis(&self, genesis: &Block) -> Result<()> {
        let bytes = genesis.serialize()?;
        let hash = genesis.hash();
        self.blocks
            .transaction(|tx| {
                if tx.get(TIP_KEY)?.is_some() {
                    return Err(ConflictableTransactionError::Abort(
                        LedgerError::StoreAlreadyExists,
                    ));
                }
                tx.insert(&hash[..], bytes.as_slice())?;
                tx.insert(TIP_KEY, &hash[..])?;
                Ok(())
            })
            .map_err(unwrap_tx_error)?;
        info!("genesis {} written", hex::encode(hash));
        Ok(())
    }

    fn append(&self, block: &Block) -> Result<()> {
        let Some(parent) = block.prev_block_hash().copied() else {
            return Err(LedgerError::StoreAlreadyExists);
        };
        let bytes = block.serialize()?;
        let hash = block.hash();
        self.blocks
            .transaction(|tx| {
                let current = match tx.get(TIP_KEY)? {
                    Some(v) => Some(to_hash(&v).map_err(ConflictableTransactionError::Abort)?),
                    None => None,
                };
                if current != Some(parent) {
                    return Err(ConflictableTransactionError::Abort(LedgerError::TipMoved {
                        expected: parent,
                        found: current,
                    }));
                }
                tx.insert(&hash[..], bytes.as_slice())?;
                tx.insert(TIP_KEY, &hash[..])?;
                Ok(())
            })
            .map_err(unwrap_tx_error)?;
        debug!("block {} appended, tip moved", hex::encode(hash));
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.db.flush().map_err(backend)?;
        Ok(())
    }
}

fn backend(err: sled::Error) -> LedgerError {
    LedgerError::Storage(err.into())
}

fn unwrap_tx_error(err: TransactionError<LedgerError>) -> LedgerError {
    match err {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => backend(e),
    }
}

fn to_hash(bytes: &[u8]) -> Result<Hash> {
    Hash::try_from(bytes).map_err(|_| {
        LedgerError::CorruptRecord(format!("tip pointer has {} bytes, expected 32", bytes.len()))
    })
}
