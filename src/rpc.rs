// RPC client for querying block versions from a bitcoind-style full node

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, trace};

use crate::source::VersionSource;
use crate::types::{BlockHeight, BlockVersion};

/// JSON-RPC request
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: serde_json::Value,
    id: u64,
}

/// JSON-RPC response
///
/// bitcoind answers in the 1.0 envelope: `result`, `error` and `id`, with no
/// `jsonrpc` member.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
    #[allow(dead_code)]
    #[serde(default)]
    id: serde_json::Value,
}

/// JSON-RPC error object
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Failures talking to the node
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Http(StatusCode),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Error code: {code}, message: {message}")]
    Remote { code: i64, message: String },

    #[error("Empty result for {0}")]
    EmptyResult(String),

    #[error("Unexpected result for {method}: {detail}")]
    UnexpectedResult { method: String, detail: String },
}

/// Block fields used by the monitor (`getblock` verbose output)
#[derive(Debug, Clone, Deserialize)]
pub struct BlockInfo {
    pub hash: String,
    pub version: BlockVersion,
    #[serde(default)]
    pub height: Option<BlockHeight>,
}

/// Connection settings for the node
#[derive(Debug, Clone)]
pub struct RpcEndpoint {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub timeout: Duration,
}

impl RpcEndpoint {
    /// Base URL the requests are posted to
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// URL with credentials for logging, password masked
    pub fn redacted_url(&self) -> String {
        format!("http://{}:***@{}:{}", self.user, self.host, self.port)
    }
}

/// RPC client for a full node
pub struct RpcClient {
    url: String,
    user: String,
    pass: String,
    client: Client,
    request_id: AtomicU64,
}

impl RpcClient {
    /// Create new RPC client
    pub fn new(endpoint: &RpcEndpoint) -> Result<Self, RpcError> {
        let client = Client::builder().timeout(endpoint.timeout).build()?;

        Ok(Self {
            url: endpoint.url(),
            user: endpoint.user.clone(),
            pass: endpoint.pass.clone(),
            client,
            request_id: AtomicU64::new(1),
        })
    }

    /// Get next request ID
    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Make a JSON-RPC call
    fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, RpcError> {
        let request = JsonRpcRequest {
            jsonrpc: "1.0",
            method,
            params,
            id: self.next_id(),
        };
        trace!("RPC request {} {} {}", request.id, method, request.params);

        let response = self
            .client
            .post(&self.url)
            .basic_auth(&self.user, Some(&self.pass))
            .json(&request)
            .send()?;

        let status = response.status();
        let body = response.text()?;

        decode_response(method, status, &body)
    }

    /// Hash of the block at `height` on the active chain
    pub fn get_block_hash(&self, height: BlockHeight) -> Result<String, RpcError> {
        self.call("getblockhash", serde_json::json!([height]))
    }

    /// Block metadata for a hash
    pub fn get_block(&self, hash: &str) -> Result<BlockInfo, RpcError> {
        self.call("getblock", serde_json::json!([hash]))
    }

    /// Height of the node's best block
    pub fn get_block_count(&self) -> Result<BlockHeight, RpcError> {
        self.call("getblockcount", serde_json::json!([]))
    }
}

impl VersionSource for RpcClient {
    fn block_version(&self, height: BlockHeight) -> Result<BlockVersion, RpcError> {
        let hash = self.get_block_hash(height)?;
        let block = self.get_block(&hash)?;
        debug!("Fetched block {} ({}) version {}", height, block.hash, block.version);
        Ok(block.version)
    }
}

/// Turn a raw HTTP reply into the call's result
///
/// bitcoind reports method errors with a non-200 status *and* an error object,
/// so the error object is checked before the status.
fn decode_response<T: DeserializeOwned>(
    method: &str,
    status: StatusCode,
    body: &str,
) -> Result<T, RpcError> {
    let envelope: JsonRpcResponse = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(_) if !status.is_success() => return Err(RpcError::Http(status)),
        Err(e) => return Err(RpcError::Parse(e)),
    };

    if let Some(error) = envelope.error {
        return Err(RpcError::Remote {
            code: error.code,
            message: error.message,
        });
    }

    if !status.is_success() {
        return Err(RpcError::Http(status));
    }

    let result = envelope
        .result
        .ok_or_else(|| RpcError::EmptyResult(method.to_string()))?;

    serde_json::from_value(result).map_err(|e| RpcError::UnexpectedResult {
        method: method.to_string(),
        detail: e.to_string(),
    })
}
