use serde::{
    Deserialize,
    Serialize,
    de::DeserializeOwned,
};
use serde_json::{
    Value,
    json,
};
use std::{
    fmt,
    future::Future,
    sync::{
        Arc,
        atomic::{
            AtomicU64,
            Ordering,
        },
    },
    time::Duration,
};
use thiserror::Error;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// EIP-1193: the user rejected the request.
pub const USER_REJECTED_CODE: i64 = 4001;
/// EIP-1193 / EIP-3085: the requested chain has not been added to the agent.
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("invalid rpc response: {0}")]
    Decode(String),
}

impl RpcError {
    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        RpcError::Rpc {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            RpcError::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_unrecognized_chain(&self) -> bool {
        self.code() == Some(UNRECOGNIZED_CHAIN_CODE)
    }
}

/// Read-only chain access used for contract calls and receipt lookups.
pub trait ChainReader {
    fn call(
        &self,
        to: &str,
        data: &[u8],
    ) -> impl Future<Output = Result<Vec<u8>, RpcError>> + Send;

    fn transaction_receipt(
        &self,
        hash: &str,
    ) -> impl Future<Output = Result<Option<TransactionReceipt>, RpcError>> + Send;
}

#[derive(Clone)]
pub struct JsonRpcClient {
    url: String,
    http: reqwest::Client,
    next_id: Arc<AtomicU64>,
}

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

impl<'a> JsonRpcRequest<'a> {
    fn new(id: u64, method: &'a str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorDto>,
}

#[derive(Deserialize)]
struct JsonRpcErrorDto {
    code: i64,
    message: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        self.status.as_deref() == Some("0x1")
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct LogEntry {
    pub address: String,
    #[serde(default)]
    pub topics: Vec<String>,
    pub data: String,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            url: url.into(),
            http,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = JsonRpcRequest::new(id, method, params);
        debug!(%method, id, url = %self.url, "rpc request");
        let res = self.http.post(&self.url).json(&body).send().await?;
        let status = res.status();
        let bytes = res.bytes().await?;
        decode_response(&bytes, status.is_success()).map_err(|err| match err {
            RpcError::Decode(_) if !status.is_success() => RpcError::Decode(format!(
                "endpoint responded with {status}: {}",
                String::from_utf8_lossy(&bytes)
            )),
            other => other,
        })
    }
}

impl ChainReader for JsonRpcClient {
    async fn call(&self, to: &str, data: &[u8]) -> Result<Vec<u8>, RpcError> {
        let params = json!([{ "to": to, "data": encode_data(data) }, "latest"]);
        let raw: String = self.request("eth_call", params).await?;
        parse_data(&raw)
    }

    async fn transaction_receipt(
        &self,
        hash: &str,
    ) -> Result<Option<TransactionReceipt>, RpcError> {
        self.request("eth_getTransactionReceipt", json!([hash])).await
    }
}

impl fmt::Display for JsonRpcClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

fn decode_response<T: DeserializeOwned>(
    bytes: &[u8],
    status_ok: bool,
) -> Result<T, RpcError> {
    let envelope: JsonRpcResponse = serde_json::from_slice(bytes)
        .map_err(|e| RpcError::Decode(format!("malformed envelope: {e}")))?;
    if let Some(err) = envelope.error {
        return Err(RpcError::Rpc {
            code: err.code,
            message: err.message,
        });
    }
    if !status_ok {
        return Err(RpcError::Decode(String::from("non-success status")));
    }
    let value = envelope.result.unwrap_or(Value::Null);
    serde_json::from_value(value)
        .map_err(|e| RpcError::Decode(format!("unexpected result shape: {e}")))
}

/// Parses a JSON-RPC quantity such as `0x221`.
pub fn parse_quantity(raw: &str) -> Result<u128, RpcError> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(|| RpcError::Decode(format!("quantity without 0x prefix: {raw}")))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| RpcError::Decode(format!("bad quantity {raw}: {e}")))
}

pub fn parse_data(raw: &str) -> Result<Vec<u8>, RpcError> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(digits).map_err(|e| RpcError::Decode(format!("bad data {raw}: {e}")))
}

pub fn encode_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
