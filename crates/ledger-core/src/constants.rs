pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const POW_TARGET_DIFFICULTY: u32 = 24;
pub const MAX_NONCE: u64 = i64::MAX as u64;
/// How many nonces the miner tries between two cancellation checks.
pub const CANCEL_POLL_INTERVAL: u64 = 1024;
pub const SUBSIDY: u64 = 10;
pub const GENESIS_COINBASE_DATA: &str =
    "The Times 03/Jan/2009 Chancellor on brink of second bailout for banks";
/// Reserved store key holding the tip hash. A single byte never collides with a 32-byte hash.
pub const TIP_KEY: &[u8] = b"l";
