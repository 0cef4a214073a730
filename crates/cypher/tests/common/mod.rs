//! Common helpers for integration tests.
//! Some helpers are only used by specific test binaries; allow dead_code to avoid per-binary warnings.
#![allow(dead_code)]

use alloy::primitives::{Address, B256};
use alloy::sol_types::SolEvent;
use serde_json::{json, Value};
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("cypher=debug".parse().unwrap()))
        .with_test_writer()
        .try_init();
}

/// Address whose last byte is `b` (0xA -> 0x00..0a).
pub fn addr(b: u8) -> Address {
    Address::with_last_byte(b)
}

/// Lowercase `0x` key for `addr(b)`.
pub fn key(b: u8) -> String {
    format!("0x{}", hex::encode(addr(b)))
}

/// JSON-RPC log (eth_getLogs shape) for `event` emitted by `emitter`.
pub fn json_log<E: SolEvent>(emitter: Address, block: u64, log_index: u64, event: &E) -> Value {
    let data = event.encode_log_data();
    json!({
        "address": format!("0x{}", hex::encode(emitter)),
        "blockNumber": format!("0x{:x}", block),
        "logIndex": format!("0x{:x}", log_index),
        "transactionHash": format!("0x{}", hex::encode(B256::with_last_byte(block as u8))),
        "topics": data
            .topics()
            .iter()
            .map(|t| format!("0x{}", hex::encode(t)))
            .collect::<Vec<_>>(),
        "data": format!("0x{}", hex::encode(&data.data)),
    })
}

fn hex_u64(v: &Value) -> Option<u64> {
    let s = v.as_str()?;
    u64::from_str_radix(s.strip_prefix("0x").unwrap_or(s), 16).ok()
}

/// JSON-RPC endpoint served by axum on a local port.
pub struct RpcStub {
    pub url: String,
    requests: Arc<Mutex<Vec<Value>>>,
    task: JoinHandle<()>,
}

impl RpcStub {
    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r["method"] == method)
            .count()
    }
}

impl Drop for RpcStub {
    fn drop(&mut self) {
        self.task.abort();
    }
}

type Handler = dyn Fn(&str, &Value) -> Result<Value, String> + Send + Sync;

#[derive(Clone)]
struct StubState {
    handler: Arc<Handler>,
    requests: Arc<Mutex<Vec<Value>>>,
}

/// Spawn a stub whose `handler(method, params)` produces the result (or an RPC error message).
pub async fn spawn_rpc_stub<F>(handler: F) -> RpcStub
where
    F: Fn(&str, &Value) -> Result<Value, String> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let url = format!("http://{}", listener.local_addr().expect("local addr"));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = StubState {
        handler: Arc::new(handler),
        requests: Arc::clone(&requests),
    };
    let router = Router::new().route("/", post(rpc)).with_state(state);
    let task = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve stub");
    });
    RpcStub {
        url,
        requests,
        task,
    }
}

async fn rpc(State(state): State<StubState>, Json(body): Json<Value>) -> Json<Value> {
    state.requests.lock().unwrap().push(body.clone());
    let method = body["method"].as_str().expect("request without method");
    let response = match (state.handler)(method, &body["params"]) {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": body["id"].clone(), "result": result }),
        Err(message) => json!({
            "jsonrpc": "2.0",
            "id": body["id"].clone(),
            "error": { "code": -32000, "message": message },
        }),
    };
    Json(response)
}

/// Stub serving `tip` for eth_blockNumber and the subset of `logs` inside each eth_getLogs range.
pub async fn spawn_chain_stub(tip: u64, logs: Vec<Value>) -> RpcStub {
    spawn_rpc_stub(move |method, params| match method {
        "eth_blockNumber" => Ok(json!(format!("0x{:x}", tip))),
        "eth_getLogs" => {
            let filter = &params[0];
            let from = hex_u64(&filter["fromBlock"]).ok_or("bad fromBlock")?;
            let to = hex_u64(&filter["toBlock"]).ok_or("bad toBlock")?;
            let in_range: Vec<Value> = logs
                .iter()
                .filter(|l| {
                    hex_u64(&l["blockNumber"])
                        .map(|b| b >= from && b <= to)
                        .unwrap_or(false)
                })
                .cloned()
                .collect();
            Ok(Value::Array(in_range))
        }
        other => Err(format!("method not found: {}", other)),
    })
    .await
}
