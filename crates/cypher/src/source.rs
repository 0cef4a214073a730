//! HttpLogSource: reads CypherEscrow logs over JSON-RPC for the projector.
//!
//! Chain tip via eth_blockNumber, logs via eth_getLogs in `getlogs_max_range` chunks,
//! filtered by the configured contracts and the escrow topics. Returned logs are sorted by
//! `(block_number, log_index)`. No confirmations, reorg handling, or retries here.

use crate::abi::{decode_log, log_matches_escrow, ObservedLog, ESCROW_TOPICS};
use crate::config::SourceConfig;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("RPC error: {0}")]
    Rpc(String),
    #[error("decode error: {0}")]
    Decode(String),
}

fn build_logs_filter(config: &SourceConfig, from_block: u64, to_block: u64) -> Value {
    let addresses: Vec<String> = config
        .contracts
        .iter()
        .map(|a| format!("0x{}", hex::encode(a)))
        .collect();
    let topics: Vec<String> = ESCROW_TOPICS
        .iter()
        .map(|t| format!("0x{}", hex::encode(t)))
        .collect();
    json!({
        "address": addresses,
        // Nested array: topic0 is any of the escrow events.
        "topics": [topics],
        "fromBlock": format!("0x{:x}", from_block),
        "toBlock": format!("0x{:x}", to_block),
    })
}

async fn http_json_rpc(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Value,
    id: u64,
) -> Result<Value, SourceError> {
    let body = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params
    });
    let resp = client.post(url).json(&body).send().await?;
    let json: Value = resp.json().await?;
    if let Some(err) = json.get("error") {
        return Err(SourceError::Rpc(err.to_string()));
    }
    json.get("result")
        .cloned()
        .ok_or_else(|| SourceError::Decode("Missing result".into()))
}

/// JSON-RPC log reader for a set of CypherEscrow contracts.
pub struct HttpLogSource {
    config: SourceConfig,
    http_client: reqwest::Client,
}

impl HttpLogSource {
    pub fn new(config: SourceConfig) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder().no_proxy().build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Latest block number.
    pub async fn current_tip(&self) -> Result<u64, SourceError> {
        let result = http_json_rpc(
            &self.http_client,
            &self.config.http_url,
            "eth_blockNumber",
            json!([]),
            1,
        )
        .await?;
        let s = result
            .as_str()
            .ok_or_else(|| SourceError::Decode("blockNumber not string".into()))?;
        let s = s.strip_prefix("0x").unwrap_or(s);
        u64::from_str_radix(s, 16).map_err(|e| SourceError::Decode(e.to_string()))
    }

    /// Reads the tip and returns it with every log from `next_block` up to it, or `None` when
    /// the tip is still behind `next_block`.
    pub async fn fetch_new(
        &self,
        next_block: u64,
    ) -> Result<Option<(u64, Vec<ObservedLog>)>, SourceError> {
        let tip = self.current_tip().await?;
        if tip < next_block {
            return Ok(None);
        }
        let logs = self.fetch_logs(next_block, tip).await?;
        Ok(Some((tip, logs)))
    }

    /// All escrow logs in `[from_block, to_block]`, ordered by `(block_number, log_index)`.
    ///
    /// Logs that fail to decode are logged and dropped.
    pub async fn fetch_logs(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<ObservedLog>, SourceError> {
        let mut out = Vec::new();
        if self.config.contracts.is_empty() {
            return Ok(out);
        }
        let max_range = self.config.getlogs_max_range.max(1);
        let mut from = from_block;
        while from <= to_block {
            let to = from.saturating_add(max_range - 1).min(to_block);
            let filter = build_logs_filter(&self.config, from, to);
            let result = http_json_rpc(
                &self.http_client,
                &self.config.http_url,
                "eth_getLogs",
                json!([filter]),
                2,
            )
            .await?;
            let logs = result
                .as_array()
                .ok_or_else(|| SourceError::Decode("getLogs not array".into()))?;
            let before = out.len();
            for raw in logs.iter().filter(|log| log_matches_escrow(log)) {
                match decode_log(raw) {
                    Ok(observed) => out.push(observed),
                    Err(e) => tracing::warn!(reason = %e, "escrow log skipped: decode failed"),
                }
            }
            tracing::debug!(count = out.len() - before, from, to, "fetched escrow logs");
            if to == u64::MAX {
                break;
            }
            from = to + 1;
        }
        out.sort_by_key(|o| o.context.position());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;

    #[test]
    fn logs_filter_shape() {
        let config = SourceConfig::new(
            "http://127.0.0.1:8545",
            vec![Address::with_last_byte(1), Address::with_last_byte(2)],
        );
        let f = build_logs_filter(&config, 16, 31);
        assert_eq!(f["fromBlock"], "0x10");
        assert_eq!(f["toBlock"], "0x1f");
        assert_eq!(f["address"].as_array().unwrap().len(), 2);
        assert_eq!(f["topics"][0].as_array().unwrap().len(), ESCROW_TOPICS.len());
        assert_eq!(
            f["address"][0],
            format!("0x{}01", "00".repeat(19))
        );
    }
}
