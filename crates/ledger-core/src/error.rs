use crate::Hash;

/// Everything the ledger can fail with.
///
/// `InsufficientFunds`, `InvalidAmount` and `ValueOverflow` are raised before
/// any mining starts; the chain is untouched when they are returned.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("chain store already exists")]
    StoreAlreadyExists,

    #[error("no existing chain store found, create one first")]
    StoreNotFound,

    #[error("serialization failure: {0}")]
    Serialization(String),

    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("transfer amount must be greater than zero")]
    InvalidAmount,

    #[error("sum of output values overflows")]
    ValueOverflow,

    #[error("corrupt block record: {0}")]
    CorruptRecord(String),

    #[error("block {} referenced by the chain is missing", hex::encode(.0))]
    MissingBlock(Hash),

    #[error(
        "chain tip moved while mining: expected {}, found {}",
        hex::encode(.expected),
        .found.map(hex::encode).unwrap_or_else(|| "none".into())
    )]
    TipMoved { expected: Hash, found: Option<Hash> },

    #[error("mining cancelled before a valid nonce was found")]
    MiningCancelled,

    #[error("nonce space exhausted without meeting the target")]
    NonceExhausted,

    #[error("storage backend error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl LedgerError {
    /// Domain errors a caller can report and carry on from.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LedgerError::InsufficientFunds { .. }
                | LedgerError::InvalidAmount
                | LedgerError::ValueOverflow
                | LedgerError::MiningCancelled
        )
    }
}

impl From<bincode::Error> for LedgerError {
    fn from(err: bincode::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_funds_message() {
        let err = LedgerError::InsufficientFunds {
            required: 11,
            available: 10,
        };
        assert_eq!(
            err.to_string(),
            "insufficient funds: required 11, available 10"
        );
        assert!(err.is_recoverable());
    }

    #[test]
    fn tip_moved_message_without_found_tip() {
        let err = LedgerError::TipMoved {
            expected: [0u8; 32],
            found: None,
        };
        assert!(err.to_string().ends_with("found none"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn backend_errors_are_fatal() {
        let err: LedgerError = anyhow::anyhow!("disk on fire").into();
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("disk on fire"));
    }
}
