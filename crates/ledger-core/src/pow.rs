use crate::constants::{CANCEL_POLL_INTERVAL, MAX_NONCE};
use crate::digest::{int_to_bytes, sha256_concat};
use crate::error::{LedgerError, Result};
use crate::{Block, Hash};
use num_bigint::BigUint;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Stops a running nonce search, either on request or once a deadline passes.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Hash puzzle over a block's back-link, transactions, timestamp and nonce.
pub struct ProofOfWork {
    /// Everything in the preimage except the trailing nonce.
    prefix: Vec<u8>,
    target: BigUint,
}

impl ProofOfWork {
    pub fn new(block: &Block, difficulty_bits: u32) -> Self {
        let prev = block.prev_block_hash().map_or(&[][..], |h| &h[..]);
        let txs_digest = block.hash_transactions();
        let mut prefix = Vec::with_capacity(prev.len() + 32 + 8 + 8);
        prefix.extend_from_slice(prev);
        prefix.extend_from_slice(&txs_digest);
        prefix.extend_from_slice(&int_to_bytes(block.timestamp()));
        prefix.extend_from_slice(&int_to_bytes(i64::from(difficulty_bits)));
        let target = BigUint::from(1u8) << (256 - difficulty_bits.min(256)) as usize;
        Self { prefix, target }
    }

    pub fn target(&self) -> &BigUint {
        &self.target
    }

    pub fn hash_with_nonce(&self, nonce: u64) -> Hash {
        let nonce = int_to_bytes(nonce as i64);
        sha256_concat([&self.prefix[..], &nonce[..]])
    }

    pub fn meets_target(&self, hash: &Hash) -> bool {
        BigUint::from_bytes_be(hash) < self.target
    }

    /// Tries nonces 0, 1, 2, ... and returns the first one whose hash is below
    /// the target. The token is polled every `CANCEL_POLL_INTERVAL` nonces.
    pub fn run(&self, cancel: &CancelToken) -> Result<(u64, Hash)> {
        self.run_up_to(MAX_NONCE, cancel)
    }

    /// Sequential search over `0..=last_nonce`.
    pub(crate) fn run_up_to(&self, last_nonce: u64, cancel: &CancelToken) -> Result<(u64, Hash)> {
        for nonce in 0..=last_nonce {
            if nonce % CANCEL_POLL_INTERVAL == 0 && cancel.is_cancelled() {
                warn!(nonce, "mining cancelled");
                return Err(LedgerError::MiningCancelled);
            }
            let hash = self.hash_with_nonce(nonce);
            if self.meets_target(&hash) {
                return Ok((nonce, hash));
            }
        }
        Err(LedgerError::NonceExhausted)
    }

    /// Recomputes the digest for `nonce` and checks it is below the target and
    /// equal to `expected`.
    pub fn validate(&self, nonce: u64, expected: &Hash) -> bool {
        let hash = self.hash_with_nonce(nonce);
        &hash == expected && self.meets_target(&hash)
    }
}

/// Checks a stored block against the puzzle for `difficulty_bits`.
pub fn validate(block: &Block, difficulty_bits: u32) -> bool {
    ProofOfWork::new(block, difficulty_bits).validate(block.nonce(), block.hash())
}

pub fn count_leading_zero_bits(hash: &Hash) -> u32 {
    let mut total = 0u32;
    for b in hash {
        if *b == 0 {
            total += 8;
        } else {
            total += b.leading_zeros();
            break;
        }
    }
    total
}
