use crate::config::ChainConfig;
use crate::digest::sha256_concat;
use crate::error::{LedgerError, Result};
use crate::mine::run_parallel;
use crate::pow::{self, CancelToken, ProofOfWork};
use crate::transaction::Transaction;
use crate::Hash;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

/// A mined block. Only produced by [`Block::mine`] (or decoded from the store)
/// and never modified afterwards; other blocks refer to it by hash alone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    timestamp: i64,
    transactions: Vec<Transaction>,
    /// `None` only for the genesis block.
    prev_block_hash: Option<Hash>,
    hash: Hash,
    nonce: u64,
}

impl Block {
    /// Candidate with no proof of work yet.
    pub(crate) fn unmined(
        timestamp: i64,
        transactions: Vec<Transaction>,
        prev_block_hash: Option<Hash>,
    ) -> Self {
        Self {
            timestamp,
            transactions,
            prev_block_hash,
            hash: [0u8; 32],
            nonce: 0,
        }
    }

    /// Stamps the current time on a candidate and searches for its nonce.
    pub fn mine(
        transactions: Vec<Transaction>,
        prev_block_hash: Option<Hash>,
        config: &ChainConfig,
        cancel: &CancelToken,
    ) -> Result<Self> {
        Self::mine_at(now(), transactions, prev_block_hash, config, cancel)
    }

    pub fn genesis(coinbase: Transaction, config: &ChainConfig, cancel: &CancelToken) -> Result<Self> {
        Self::mine(vec![coinbase], None, config, cancel)
    }

    pub(crate) fn mine_at(
        timestamp: i64,
        transactions: Vec<Transaction>,
        prev_block_hash: Option<Hash>,
        config: &ChainConfig,
        cancel: &CancelToken,
    ) -> Result<Self> {
        let mut block = Self::unmined(timestamp, transactions, prev_block_hash);
        let pow = ProofOfWork::new(&block, config.difficulty_bits);
        let (nonce, hash) = if config.parallel_mining {
            run_parallel(&pow, cancel)?
        } else {
            pow.run(cancel)?
        };
        block.nonce = nonce;
        block.hash = hash;

        info!(
            "Mined block {} with nonce {} ({} txs, {} leading zero bits)",
            hex::encode(hash),
            nonce,
            block.transactions.len(),
            pow::count_leading_zero_bits(&hash)
        );
        Ok(block)
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn prev_block_hash(&self) -> Option<&Hash> {
        self.prev_block_hash.as_ref()
    }

    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_block_hash.is_none()
    }

    /// SHA-256 over the concatenated transaction identifiers.
    pub fn hash_transactions(&self) -> Hash {
        sha256_concat(self.transactions.iter().map(|tx| &tx.id()[..]))
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| LedgerError::CorruptRecord(e.to_string()))
    }
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::HASH_HEX_SIZE;
    use crate::transaction::{OutPoint, TxInput, TxOutput};

    fn config() -> ChainConfig {
        ChainConfig::with_difficulty(8)
    }

    fn genesis() -> Block {
        let coinbase = Transaction::coinbase("alice", "", 10);
        Block::genesis(coinbase, &config(), &CancelToken::new()).unwrap()
    }

    #[test]
    fn mined_block_passes_validation() {
        let block = genesis();
        assert!(pow::validate(&block, 8));
        assert!(block.is_genesis());
        assert!(block.timestamp() > 0);
        assert_eq!(hex::encode(block.hash()).len(), HASH_HEX_SIZE);
    }

    #[test]
    fn child_links_to_parent_hash() {
        let parent = genesis();
        let funding = &parent.transactions()[0];
        let spend = Transaction::new(
            vec![TxInput::spend(
                OutPoint {
                    txid: *funding.id(),
                    vout: 0,
                },
                "alice",
            )],
            vec![TxOutput::new(10, "bob")],
        );
        let child =
            Block::mine(vec![spend], Some(*parent.hash()), &config(), &CancelToken::new()).unwrap();
        assert_eq!(child.prev_block_hash(), Some(parent.hash()));
        assert!(!child.is_genesis());
        assert!(pow::validate(&child, 8));
    }

    #[test]
    fn validation_depends_on_difficulty() {
        let block = genesis();
        // The difficulty is hashed in, so the same nonce fails under another setting.
        assert!(!pow::validate(&block, 9));
    }

    #[test]
    fn tampered_block_fails_validation() {
        let mut block = genesis();
        block.timestamp += 1;
        assert!(!pow::validate(&block, 8));

        let mut block = genesis();
        block.transactions = vec![Transaction::coinbase("mallory", "", 10)];
        assert!(!pow::validate(&block, 8));
    }

    #[test]
    fn transactions_digest_is_hash_of_joined_ids() {
        let a = Transaction::coinbase("alice", "a", 10);
        let b = Transaction::coinbase("bob", "b", 10);
        let block = Block::unmined(0, vec![a.clone(), b.clone()], None);
        let mut joined = a.id().to_vec();
        joined.extend_from_slice(b.id());
        assert_eq!(block.hash_transactions(), crate::digest::sha256(&joined));
    }

    #[test]
    fn empty_block_digest_is_hash_of_nothing() {
        let block = Block::unmined(0, vec![], None);
        assert_eq!(block.hash_transactions(), crate::digest::sha256(b""));
    }

    #[test]
    fn codec_round_trip_is_exact() {
        let block = genesis();
        let bytes = block.serialize().unwrap();
        let decoded = Block::deserialize(&bytes).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(decoded.serialize().unwrap(), bytes);
        assert!(pow::validate(&decoded, 8));
    }

    #[test]
    fn encoding_starts_with_timestamp() {
        let block = genesis();
        let bytes = block.serialize().unwrap();
        assert_eq!(&bytes[..8], &block.timestamp().to_le_bytes());
    }

    #[test]
    fn garbage_is_a_corrupt_record() {
        let err = Block::deserialize(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, LedgerError::CorruptRecord(_)));
    }

    #[test]
    fn mining_with_fixed_timestamp_is_deterministic() {
        let tx = Transaction::coinbase("alice", "", 10);
        let a = Block::mine_at(1_600_000_000, vec![tx.clone()], None, &config(), &CancelToken::new())
            .unwrap();
        let b = Block::mine_at(1_600_000_000, vec![tx], None, &config(), &CancelToken::new())
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn parallel_mining_finds_the_same_block() {
        let tx = Transaction::coinbase("alice", "", 10);
        let parallel = ChainConfig {
            parallel_mining: true,
            ..config()
        };
        let a = Block::mine_at(1_600_000_000, vec![tx.clone()], None, &config(), &CancelToken::new())
            .unwrap();
        let b = Block::mine_at(1_600_000_000, vec![tx], None, &parallel, &CancelToken::new())
            .unwrap();
        assert_eq!(a.nonce(), b.nonce());
        assert_eq!(a.hash(), b.hash());
    }
}
