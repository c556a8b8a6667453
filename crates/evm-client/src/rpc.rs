//! Low-level JSON-RPC plumbing

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use surety_core::RpcError;

/// Timeout for a single RPC request (30 seconds).
/// Covers slow public endpoints; anything slower surfaces as a retryable
/// failure instead of an open-ended hang.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// EIP-1193 code for a user rejecting the request in their wallet
const USER_REJECTED_CODE: i64 = 4001;

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// JSON-RPC 2.0 client for a single endpoint
#[derive(Debug)]
pub struct JsonRpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one request and deserialize its `result`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let envelope = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        tracing::debug!(method, url = %self.url, "rpc request");

        let send = self.http.post(&self.url).json(&envelope).send();
        let response = tokio::time::timeout(REQUEST_TIMEOUT, send)
            .await
            .map_err(|_| RpcError::Timeout {
                method: method.to_string(),
            })?
            .map_err(|e| RpcError::Unreachable {
                url: format!("{}: {}", self.url, e),
            })?;

        let body: RpcResponse = response.json().await.map_err(|e| {
            RpcError::ParseError(format!("{} response was not JSON-RPC: {}", method, e))
        })?;

        if let Some(err) = body.error {
            tracing::warn!(method, code = err.code, message = %err.message, "rpc error");
            return Err(classify_error(err));
        }

        // A null result is legitimate (e.g. a receipt that is not mined
        // yet); let the caller's target type decide whether to accept it.
        let result = body.result.unwrap_or(Value::Null);
        serde_json::from_value(result)
            .map_err(|e| RpcError::ParseError(format!("{} result: {}", method, e)))
    }
}

/// Map a JSON-RPC error body onto the transport error taxonomy.
///
/// Wallet rejections (EIP-1193 code 4001, or provider-specific denial text)
/// get their own variant so flows can treat them as retryable.
fn classify_error(err: RpcErrorBody) -> RpcError {
    let lowered = err.message.to_lowercase();
    if err.code == USER_REJECTED_CODE
        || lowered.contains("user rejected")
        || lowered.contains("user denied")
    {
        return RpcError::Rejected {
            message: err.message,
        };
    }

    RpcError::ApiError {
        code: err.code,
        message: err.message,
        data: extract_revert_data(err.data.as_ref()),
    }
}

/// Pull the hex revert payload out of an error's `data` field.
///
/// Geth puts the payload directly in `data`; some providers nest it one
/// level down under another `data` key.
fn extract_revert_data(data: Option<&Value>) -> Option<String> {
    let data = data?;
    if let Some(s) = data.as_str() {
        return Some(s.to_string());
    }
    data.get("data")?.as_str().map(|s| s.to_string())
}

/// Parse a `0x`-prefixed quantity into a u64.
pub fn parse_hex_u64(input: &str) -> Result<u64, RpcError> {
    let trimmed = input
        .strip_prefix("0x")
        .ok_or_else(|| RpcError::ParseError(format!("quantity missing 0x prefix: {}", input)))?;
    u64::from_str_radix(trimmed, 16)
        .map_err(|e| RpcError::ParseError(format!("bad quantity {}: {}", input, e)))
}

/// Parse a `0x`-prefixed hex blob into bytes. An empty `0x` is valid.
pub fn parse_hex_bytes(input: &str) -> Result<Vec<u8>, RpcError> {
    let trimmed = input
        .strip_prefix("0x")
        .ok_or_else(|| RpcError::ParseError(format!("blob missing 0x prefix: {}", input)))?;
    hex::decode(trimmed).map_err(|e| RpcError::ParseError(format!("bad hex blob: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_u64() {
        assert_eq!(parse_hex_u64("0x0").unwrap(), 0);
        assert_eq!(parse_hex_u64("0x1b4").unwrap(), 436);
        assert!(parse_hex_u64("1b4").is_err());
        assert!(parse_hex_u64("0xzz").is_err());
    }

    #[test]
    fn test_parse_hex_bytes() {
        assert_eq!(parse_hex_bytes("0x").unwrap(), Vec::<u8>::new());
        assert_eq!(parse_hex_bytes("0xdead").unwrap(), vec![0xde, 0xad]);
        assert!(parse_hex_bytes("dead").is_err());
    }

    #[test]
    fn test_classify_wallet_rejection() {
        let err = RpcErrorBody {
            code: 4001,
            message: "User rejected the request.".into(),
            data: None,
        };
        assert!(matches!(classify_error(err), RpcError::Rejected { .. }));

        let err = RpcErrorBody {
            code: -32603,
            message: "MetaMask Tx Signature: User denied transaction signature.".into(),
            data: None,
        };
        assert!(matches!(classify_error(err), RpcError::Rejected { .. }));
    }

    #[test]
    fn test_classify_revert_keeps_data() {
        let err = RpcErrorBody {
            code: 3,
            message: "execution reverted: LTV exceeded".into(),
            data: Some(Value::String("0x08c379a0".into())),
        };
        match classify_error(err) {
            RpcError::ApiError { code, data, .. } => {
                assert_eq!(code, 3);
                assert_eq!(data.as_deref(), Some("0x08c379a0"));
            }
            other => panic!("expected ApiError, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_nested_revert_data() {
        let nested = serde_json::json!({ "data": "0xdeadbeef" });
        assert_eq!(
            extract_revert_data(Some(&nested)).as_deref(),
            Some("0xdeadbeef")
        );
        assert_eq!(extract_revert_data(None), None);
    }
}
