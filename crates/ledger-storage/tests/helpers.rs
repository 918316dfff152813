#![allow(dead_code)]

use std::fs;

use ledger_core::{Chain, ChainConfig};
use ledger_storage::sled_store::SledStore;
use tempfile::{tempdir, TempDir};

pub const TEST_DIFFICULTY: u32 = 8;

pub fn test_config() -> ChainConfig {
    ChainConfig::with_difficulty(TEST_DIFFICULTY)
}

pub fn create_temp_dir() -> (TempDir, std::path::PathBuf) {
    // Create a temporary directory for the sled database
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("chain");
    (temp_dir, db_path)
}

pub fn create_temp_chain(reward_address: &str) -> (TempDir, std::path::PathBuf, Chain<SledStore>) {
    let (temp_dir, db_path) = create_temp_dir();
    let chain = ledger_storage::create_chain(&db_path, reward_address, test_config())
        .expect("Failed to create chain");
    (temp_dir, db_path, chain)
}

pub fn remove_temp_dir(temp_dir: TempDir) {
    let db_path = temp_dir.path().to_path_buf();
    temp_dir.close().expect("Failed to delete temp dir");
    let _ = fs::remove_dir_all(&db_path);
    // Verify the directory is removed
    assert!(!db_path.exists(), "Database directory should be removed");
}
