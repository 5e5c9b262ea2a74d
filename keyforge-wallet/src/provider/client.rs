//! Minimal JSON-RPC 2.0 client over HTTP

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use super::ProviderConfig;

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// The `error` member of a JSON-RPC response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// Method name and params of one request
pub type RpcCall = (&'static str, Value);

/// Outcome of one call: a node-reported `error` is kept apart from transport failures
pub type RpcOutcome = std::result::Result<Value, RpcErrorObject>;

/// JSON-RPC client bound to one endpoint
#[derive(Debug)]
pub struct JsonRpcClient {
    url: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs()))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: config.url.clone(),
            http,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send a request, keeping node-reported errors in the returned outcome
    pub async fn send(&self, method: &str, params: Value) -> Result<RpcOutcome> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!(method, id = request.id, "JSON-RPC request");

        let response = self.http.post(&self.url).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::Network(format!("{} returned HTTP {}", method, status)));
        }
        parse_response(&body)
    }

    /// Call `method` and decode its `result`; node errors become `Protocol`
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        match self.send(method, params).await? {
            Ok(result) => decode_result(method, result),
            Err(e) => Err(Error::Protocol(format!("{} failed ({}): {}", method, e.code, e.message))),
        }
    }
}

/// Parse a JSON-RPC response body into its result or error member
pub fn parse_response(body: &str) -> Result<RpcOutcome> {
    let response: RpcResponse = serde_json::from_str(body)
        .map_err(|e| Error::Protocol(format!("Malformed JSON-RPC response: {}", e)))?;

    match (response.result, response.error) {
        (_, Some(error)) => Ok(Err(error)),
        (Some(result), None) => Ok(Ok(result)),
        (None, None) => Ok(Ok(Value::Null)),
    }
}

/// Decode a `result` value into the expected shape
pub fn decode_result<T: DeserializeOwned>(method: &str, result: Value) -> Result<T> {
    serde_json::from_value(result)
        .map_err(|e| Error::Protocol(format!("Unexpected {} result: {}", method, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_result() {
        let outcome = parse_response(r#"{"jsonrpc":"2.0","id":1,"result":{"value":42}}"#).unwrap();
        assert_eq!(outcome, Ok(json!({"value": 42})));
    }

    #[test]
    fn test_parse_error_member() {
        let outcome = parse_response(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"Invalid params"}}"#,
        )
        .unwrap();
        assert_eq!(outcome, Err(RpcErrorObject { code: -32602, message: "Invalid params".to_string() }));
    }

    #[test]
    fn test_malformed_body_is_protocol_error() {
        assert!(matches!(parse_response("<html>bad gateway</html>"), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_decode_result_shape_mismatch() {
        let decoded: Result<u64> = decode_result("getBalance", json!("not a number"));
        assert!(matches!(decoded, Err(Error::Protocol(_))));
    }

    #[test]
    fn test_request_shape() {
        let request = RpcRequest { jsonrpc: "2.0", id: 7, method: "eth_getBalance", params: json!(["0xabc", "latest"]) };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"jsonrpc": "2.0", "id": 7, "method": "eth_getBalance", "params": ["0xabc", "latest"]})
        );
    }
}
