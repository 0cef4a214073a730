//! Example: replay CypherEscrow history from an RPC endpoint into an in-memory store.
//!
//! Backfills eth_getLogs from `--from-block` to the current tip, applies every log through the
//! projector, and prints the resulting entity snapshot as JSON. With `--follow` it keeps polling
//! the tip until Ctrl-C, then prints the snapshot. Without `--follow` any fetch or projection
//! failure ends the run with an error; with it, fetch failures are retried on the next poll.
//!
//! Shell records are owned by another component; `--shell <ESCROW>` seeds one so AmountStopped
//! events for that escrow are materialized.
//!
//! Usage:
//!
//!   cargo run -p cypher --example replay -- --rpc-url <HTTP_URL> --contract <ESCROW_ADDRESS> [--contract ...]
//!
//! Options:
//!   --from-block <N>  First block to read. Default: 0.
//!   --shell <ADDR>    Seed a shell EscrowTransaction for this escrow (repeatable).
//!   --follow          Keep polling for new blocks until Ctrl-C.

use alloy::primitives::Address;
use cypher::{seed_shell, HttpLogSource, MemoryStore, Projector, SourceConfig};
use std::str::FromStr;
use std::time::Duration;

fn parse_address(s: &str) -> Result<Address, String> {
    Address::from_str(s.trim()).map_err(|e| format!("invalid address {}: {}", s, e))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let args: Vec<String> = std::env::args().collect();
    let mut rpc_url = String::new();
    let mut contracts = Vec::new();
    let mut shells = Vec::new();
    let mut from_block: u64 = 0;
    let mut follow = false;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--rpc-url" => {
                i += 1;
                rpc_url = args.get(i).cloned().unwrap_or_default();
            }
            "--contract" => {
                i += 1;
                contracts.push(parse_address(args.get(i).map(String::as_str).unwrap_or(""))?);
            }
            "--shell" => {
                i += 1;
                shells.push(parse_address(args.get(i).map(String::as_str).unwrap_or(""))?);
            }
            "--from-block" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    from_block = s.parse()?;
                }
            }
            "--follow" => follow = true,
            "--help" | "-h" => {
                eprintln!(
                    "Usage: replay --rpc-url <HTTP_URL> --contract <ESCROW_ADDRESS> [--contract ...] [--from-block N] [--shell ADDR] [--follow]\n\
                     Replays CypherEscrow logs into an in-memory store and prints the entity snapshot as JSON."
                );
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }
    if rpc_url.is_empty() || contracts.is_empty() {
        eprintln!("Usage: replay --rpc-url <HTTP_URL> --contract <ESCROW_ADDRESS> [--contract ...]");
        std::process::exit(1);
    }

    let config = SourceConfig::new(rpc_url, contracts).start_block(from_block);
    let poll = Duration::from_secs(config.poll_interval_secs);
    let source = HttpLogSource::new(config)?;

    let mut projector = Projector::new(MemoryStore::new());
    for shell in &shells {
        seed_shell(projector.store_mut(), shell)?;
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let mut next = source.config().start_block;
        loop {
            match source.fetch_new(next).await {
                Ok(Some((tip, logs))) => {
                    let stats = projector.apply_all(&logs)?;
                    tracing::info!(
                        applied = stats.applied,
                        skipped = stats.skipped,
                        from = next,
                        to = tip,
                        "replayed range"
                    );
                    next = tip + 1;
                }
                Ok(None) => {}
                Err(e) if follow => tracing::warn!(reason = %e, "fetch failed, retrying"),
                Err(e) => return Err(e.into()),
            }
            if !follow {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(poll) => {}
                _ = tokio::signal::ctrl_c() => break,
            }
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    println!("{}", serde_json::to_string_pretty(&projector.store().snapshot())?);
    Ok(())
}
