pub(crate) const DEFAULT_LISTEN: &str = "127.0.0.1:8080";
pub(crate) const DEFAULT_MINING_TIMEOUT_SECS: u64 = 120;
/// Upper bound on blocks returned by `GET /chain/blocks`.
pub(crate) const MAX_BLOCKS_PER_REQUEST: usize = 250;
