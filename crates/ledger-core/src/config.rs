use crate::constants::{POW_TARGET_DIFFICULTY, SUBSIDY};
use num_bigint::BigUint;
use serde::Deserialize;
use std::time::Duration;

/// Parameters fixed for the lifetime of a chain.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ChainConfig {
    /// Leading zero bits a block hash must have.
    #[serde(default = "default_difficulty_bits")]
    pub difficulty_bits: u32,
    /// Value minted by a coinbase transaction.
    #[serde(default = "default_subsidy")]
    pub subsidy: u64,
    /// Search nonces on the rayon pool instead of the calling thread.
    #[serde(default)]
    pub parallel_mining: bool,
    /// Give up mining after this many seconds.
    #[serde(default)]
    pub mining_timeout_secs: Option<u64>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty_bits: default_difficulty_bits(),
            subsidy: default_subsidy(),
            parallel_mining: false,
            mining_timeout_secs: None,
        }
    }
}

impl ChainConfig {
    pub fn with_difficulty(difficulty_bits: u32) -> Self {
        Self {
            difficulty_bits,
            ..Self::default()
        }
    }

    /// `2^(256 - difficulty_bits)`; a block hash must be strictly below it.
    pub fn target(&self) -> BigUint {
        BigUint::from(1u8) << (256 - self.difficulty_bits.min(256)) as usize
    }

    pub fn mining_timeout(&self) -> Option<Duration> {
        self.mining_timeout_secs.map(Duration::from_secs)
    }
}

fn default_difficulty_bits() -> u32 {
    POW_TARGET_DIFFICULTY
}

fn default_subsidy() -> u64 {
    SUBSIDY
}
