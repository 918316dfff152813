//! In-process `ChainStore`, for tests and callers that do not need persistence.

use crate::block::Block;
use crate::chain::ChainStore;
use crate::error::{LedgerError, Result};
use crate::Hash;
use anyhow::anyhow;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Inner {
    /// Encoded records, so reads go through the same codec as the sled store.
    blocks: HashMap<Hash, Vec<u8>>,
    tip: Option<Hash>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.blocks.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| anyhow!("memory store lock poisoned").into())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned").into())
    }

    /// Writes a block and points the tip at it with no linkage checks.
    #[cfg(test)]
    pub(crate) fn insert_unchecked(&self, block: &Block) -> Result<()> {
        let bytes = block.serialize()?;
        let mut inner = self.write()?;
        inner.blocks.insert(*block.hash(), bytes);
        inner.tip = Some(*block.hash());
        Ok(())
    }
}

impl ChainStore for MemoryStore {
    fn tip(&self) -> Result<Option<Hash>> {
        Ok(self.read()?.tip)
    }

    fn get_block(&self, hash: &Hash) -> Result<Option<Block>> {
        self.read()?
            .blocks
            .get(hash)
            .map(|bytes| Block::deserialize(bytes))
            .transpose()
    }

    fn init_genesis(&self, genesis: &Block) -> Result<()> {
        let bytes = genesis.serialize()?;
        let mut inner = self.write()?;
        if inner.tip.is_some() {
            return Err(LedgerError::StoreAlreadyExists);
        }
        inner.blocks.insert(*genesis.hash(), bytes);
        inner.tip = Some(*genesis.hash());
        Ok(())
    }

    fn append(&self, block: &Block) -> Result<()> {
        let bytes = block.serialize()?;
        let mut inner = self.write()?;
        let Some(expected) = block.prev_block_hash().copied() else {
            return Err(LedgerError::StoreAlreadyExists);
        };
        if inner.tip != Some(expected) {
            return Err(LedgerError::TipMoved {
                expected,
                found: inner.tip,
            });
        }
        inner.blocks.insert(*block.hash(), bytes);
        inner.tip = Some(*block.hash());
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}
