//! Single-node ledger: hash-linked blocks secured by proof of work, holding
//! transfers resolved through unspent outputs.

pub mod block;
pub mod chain;
pub mod config;
pub mod constants;
pub mod digest;
pub mod error;
pub mod memory_store;
pub mod mine;
pub mod pow;
pub mod transaction;
pub mod utxo;

pub type Hash = [u8; 32];

pub use block::Block;
pub use chain::{BlockCheck, Chain, ChainIter, ChainStore};
pub use config::ChainConfig;
pub use error::{LedgerError, Result};
pub use memory_store::MemoryStore;
pub use pow::{CancelToken, ProofOfWork};
pub use transaction::{OutPoint, Transaction, TxInput, TxOutput};
pub use utxo::Utxo;
