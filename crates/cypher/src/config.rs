//! Log source configuration.

use alloy::primitives::Address;

/// Default max block range per eth_getLogs request.
pub const DEFAULT_GETLOGS_MAX_RANGE: u64 = 1000;

/// Default tip polling interval when following the chain.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;

/// Configuration for [HttpLogSource](crate::source::HttpLogSource).
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// HTTP RPC URL (eth_blockNumber, eth_getLogs).
    pub http_url: String,
    /// CypherEscrow contract addresses to read logs from.
    pub contracts: Vec<Address>,
    /// First block to backfill from on startup.
    pub start_block: u64,
    /// Max block range per eth_getLogs request.
    pub getlogs_max_range: u64,
    /// Seconds between tip polls when following.
    pub poll_interval_secs: u64,
}

impl SourceConfig {
    pub fn new(http_url: impl Into<String>, contracts: Vec<Address>) -> Self {
        Self {
            http_url: http_url.into(),
            contracts,
            start_block: 0,
            getlogs_max_range: DEFAULT_GETLOGS_MAX_RANGE,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }

    pub fn start_block(mut self, block: u64) -> Self {
        self.start_block = block;
        self
    }

    pub fn getlogs_max_range(mut self, range: u64) -> Self {
        self.getlogs_max_range = range.max(1);
        self
    }
}
