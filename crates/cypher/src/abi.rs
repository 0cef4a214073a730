//! ABI types and decoding for the CypherEscrow contract.
//!
//! Event definitions plus decoding from the JSON-RPC log shape
//! (eth_getLogs result / eth_subscription payload).

use alloy::primitives::{Address, B256};
use alloy::sol;
use alloy::sol_types::SolEvent;
use anyhow::{Context, Result};
use serde_json::Value;

sol! {
    /// Emitted by the limiter check when an escrow attempt is stopped and queued.
    #[derive(Debug, PartialEq, Eq)]
    event AmountStopped(
        address indexed origin,
        address indexed protocol,
        address indexed dst,
        address tokenContract,
        uint256 amount,
        uint256 counter
    );

    #[derive(Debug, PartialEq, Eq)]
    event TransactionAccepted(bytes32 key);

    #[derive(Debug, PartialEq, Eq)]
    event TransactionDenied(bytes32 key);

    #[derive(Debug, PartialEq, Eq)]
    event OracleAdded(address oracle);

    #[derive(Debug, PartialEq, Eq)]
    event TimeLimitSet(uint256 timeLimit);

    #[derive(Debug, PartialEq, Eq)]
    event AddressAddedToWhitelist(address user);
}

/// Decoded CypherEscrow event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscrowEvent {
    AmountStopped(AmountStopped),
    TransactionAccepted(TransactionAccepted),
    TransactionDenied(TransactionDenied),
    OracleAdded(OracleAdded),
    TimeLimitSet(TimeLimitSet),
    AddressAddedToWhitelist(AddressAddedToWhitelist),
}

impl EscrowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            EscrowEvent::AmountStopped(_) => AmountStopped::SIGNATURE,
            EscrowEvent::TransactionAccepted(_) => TransactionAccepted::SIGNATURE,
            EscrowEvent::TransactionDenied(_) => TransactionDenied::SIGNATURE,
            EscrowEvent::OracleAdded(_) => OracleAdded::SIGNATURE,
            EscrowEvent::TimeLimitSet(_) => TimeLimitSet::SIGNATURE,
            EscrowEvent::AddressAddedToWhitelist(_) => AddressAddedToWhitelist::SIGNATURE,
        }
    }
}

/// topic0 of every event the projection handles.
pub const ESCROW_TOPICS: [B256; 6] = [
    AmountStopped::SIGNATURE_HASH,
    TransactionAccepted::SIGNATURE_HASH,
    TransactionDenied::SIGNATURE_HASH,
    OracleAdded::SIGNATURE_HASH,
    TimeLimitSet::SIGNATURE_HASH,
    AddressAddedToWhitelist::SIGNATURE_HASH,
];

/// Chain position and emitter of a log. The emitting contract address keys Escrow lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventContext {
    pub address: Address,
    pub block_number: u64,
    pub log_index: u64,
    pub tx_hash: B256,
}

impl EventContext {
    pub fn position(&self) -> (u64, u64) {
        (self.block_number, self.log_index)
    }
}

/// Observed log: chain context plus the decoded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedLog {
    pub context: EventContext,
    pub event: EscrowEvent,
}

/// True if topic0 of the JSON log is one of [ESCROW_TOPICS].
pub fn log_matches_escrow(log: &Value) -> bool {
    let Some(t0) = log
        .get("topics")
        .and_then(|t| t.as_array())
        .and_then(|t| t.first())
        .and_then(|t| t.as_str())
    else {
        return false;
    };
    match parse_hex_bytes_32(t0) {
        Ok(b) => ESCROW_TOPICS.contains(&B256::from(b)),
        Err(_) => false,
    }
}

/// Decode a JSON-RPC log into an [ObservedLog]. Unknown topic0 is an error.
pub fn decode_log(log_value: &Value) -> Result<ObservedLog> {
    let address = parse_hex_bytes_20(
        log_value
            .get("address")
            .and_then(|a| a.as_str())
            .ok_or_else(|| anyhow::anyhow!("Missing address"))?,
    )?;
    let block_number = parse_hex_u64(
        log_value
            .get("blockNumber")
            .and_then(|n| n.as_str())
            .ok_or_else(|| anyhow::anyhow!("Missing blockNumber"))?,
    )?;
    let log_index = parse_hex_u64(
        log_value
            .get("logIndex")
            .and_then(|n| n.as_str())
            .ok_or_else(|| anyhow::anyhow!("Missing logIndex"))?,
    )?;
    let tx_hash = parse_hex_bytes_32(
        log_value
            .get("transactionHash")
            .and_then(|h| h.as_str())
            .ok_or_else(|| anyhow::anyhow!("Missing transactionHash"))?,
    )?;
    let data = parse_hex_bytes(
        log_value
            .get("data")
            .and_then(|d| d.as_str())
            .ok_or_else(|| anyhow::anyhow!("Missing data"))?,
    )?;
    let topics = log_value
        .get("topics")
        .and_then(|t| t.as_array())
        .ok_or_else(|| anyhow::anyhow!("Missing topics"))?
        .iter()
        .map(|t| {
            let s = t.as_str().ok_or_else(|| anyhow::anyhow!("topic not str"))?;
            parse_hex_bytes_32(s).map(B256::from)
        })
        .collect::<Result<Vec<B256>>>()?;

    let event = decode_event(&topics, &data)?;
    Ok(ObservedLog {
        context: EventContext {
            address: Address::from(address),
            block_number,
            log_index,
            tx_hash: B256::from(tx_hash),
        },
        event,
    })
}

/// Decode raw topics and data into an [EscrowEvent], dispatching on topic0.
pub fn decode_event(topics: &[B256], data: &[u8]) -> Result<EscrowEvent> {
    let topic0 = *topics
        .first()
        .ok_or_else(|| anyhow::anyhow!("log has no topics"))?;
    let topics = topics.iter().copied();
    let event = if topic0 == AmountStopped::SIGNATURE_HASH {
        EscrowEvent::AmountStopped(
            AmountStopped::decode_raw_log(topics, data, true).context("decode AmountStopped")?,
        )
    } else if topic0 == TransactionAccepted::SIGNATURE_HASH {
        EscrowEvent::TransactionAccepted(
            TransactionAccepted::decode_raw_log(topics, data, true)
                .context("decode TransactionAccepted")?,
        )
    } else if topic0 == TransactionDenied::SIGNATURE_HASH {
        EscrowEvent::TransactionDenied(
            TransactionDenied::decode_raw_log(topics, data, true)
                .context("decode TransactionDenied")?,
        )
    } else if topic0 == OracleAdded::SIGNATURE_HASH {
        EscrowEvent::OracleAdded(
            OracleAdded::decode_raw_log(topics, data, true).context("decode OracleAdded")?,
        )
    } else if topic0 == TimeLimitSet::SIGNATURE_HASH {
        EscrowEvent::TimeLimitSet(
            TimeLimitSet::decode_raw_log(topics, data, true).context("decode TimeLimitSet")?,
        )
    } else if topic0 == AddressAddedToWhitelist::SIGNATURE_HASH {
        EscrowEvent::AddressAddedToWhitelist(
            AddressAddedToWhitelist::decode_raw_log(topics, data, true)
                .context("decode AddressAddedToWhitelist")?,
        )
    } else {
        anyhow::bail!("unknown topic0 0x{}", hex::encode(topic0));
    };
    Ok(event)
}

fn parse_hex_u64(s: &str) -> Result<u64> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(s, 16).context("parse hex u64")
}

fn parse_hex_bytes(s: &str) -> Result<Vec<u8>> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(s).context("parse hex bytes")
}

fn parse_hex_bytes_32(s: &str) -> Result<[u8; 32]> {
    let bytes = parse_hex_bytes(s)?;
    if bytes.len() != 32 {
        anyhow::bail!("Expected 32 bytes, got {}", bytes.len());
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

fn parse_hex_bytes_20(s: &str) -> Result<[u8; 20]> {
    let bytes = parse_hex_bytes(s)?;
    if bytes.len() == 20 {
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Ok(out)
    } else if bytes.len() == 32 {
        // Left-padded word; take last 20.
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes[12..32]);
        Ok(out)
    } else {
        anyhow::bail!("Expected 20 or 32 bytes for address, got {}", bytes.len());
    }
}
