use crate::constants::{CANCEL_POLL_INTERVAL, MAX_NONCE};
use crate::error::{LedgerError, Result};
use crate::pow::{CancelToken, ProofOfWork};
use crate::Hash;
use rayon::prelude::*;
use tracing::warn;

/// Searches nonces on the rayon pool. `find_first` keeps the answer identical to
/// the sequential search: the lowest nonce whose hash is below the target.
pub fn run_parallel(pow: &ProofOfWork, cancel: &CancelToken) -> Result<(u64, Hash)> {
    run_parallel_up_to(pow, MAX_NONCE, cancel)
}

/// Parallel search over `0..=last_nonce`.
pub(crate) fn run_parallel_up_to(
    pow: &ProofOfWork,
    last_nonce: u64,
    cancel: &CancelToken,
) -> Result<(u64, Hash)> {
    // A cancelled poll point also ends the search; it is told apart from a
    // real solution by re-checking the hash below.
    let found = (0u64..=last_nonce).into_par_iter().find_first(|nonce| {
        (nonce % CANCEL_POLL_INTERVAL == 0 && cancel.is_cancelled())
            || pow.meets_target(&pow.hash_with_nonce(*nonce))
    });

    match found {
        Some(nonce) => {
            let hash = pow.hash_with_nonce(nonce);
            if pow.meets_target(&hash) {
                Ok((nonce, hash))
            } else {
                warn!(nonce, "parallel mining cancelled");
                Err(LedgerError::MiningCancelled)
            }
        }
        None => Err(LedgerError::NonceExhausted),
    }
}
