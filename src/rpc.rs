//! JSON-RPC style envelope used by the camera's web API.
//!
//! Requests are `{"method", "params", "id", "version"}` POSTed to
//! `<endpoint>/<service>`; replies carry either `result` (always a JSON array)
//! or `error` (`[code, message]`).

use std::sync::Arc;

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::endpoint::Endpoint;
use crate::error::{CamError, Result};
use crate::transport::Transport;

pub const DEFAULT_ID: u64 = 1;
pub const DEFAULT_VERSION: &str = "1.0";

/// API services exposed under the endpoint.
pub mod service {
    pub const CAMERA: &str = "camera";
    pub const ACCESS_CONTROL: &str = "accessControl";
    pub const SYSTEM: &str = "system";
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    pub method:  String,
    pub params:  Vec<Value>,
    pub id:      u64,
    pub version: String,
}

impl RpcRequest {
    pub fn new(method: &str, params: Vec<Value>) -> Self {
        RpcRequest {
            method:  method.into(),
            params,
            id:      DEFAULT_ID,
            version: DEFAULT_VERSION.into(),
        }
    }
}

/// Error payload of a failed call.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcFault {
    pub code:    i64,
    pub message: String,
}

impl RpcFault {
    fn from_value(v: Value) -> Self {
        match v {
            Value::Array(items) => RpcFault {
                code:    items.first().and_then(Value::as_i64).unwrap_or(-1),
                message: items
                    .get(1)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            },
            other => RpcFault { code: -1, message: other.to_string() },
        }
    }
}

impl std::fmt::Display for RpcFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code, self.message)
    }
}

/// Decoded reply to one call.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcReply {
    Result(Vec<Value>),
    Error(RpcFault),
}

impl RpcReply {
    pub fn decode(body: &[u8]) -> Result<Self> {
        #[derive(Deserialize)]
        struct Raw {
            // getMethodTypes answers under `results`
            #[serde(default, alias = "results")]
            result: Option<Value>,
            #[serde(default)]
            error:  Option<Value>,
        }

        let raw: Raw = serde_json::from_slice(body)
            .map_err(|e| CamError::Protocol(format!("reply is not valid JSON: {e}")))?;
        match (raw.result, raw.error) {
            (Some(Value::Array(items)), _) => Ok(RpcReply::Result(items)),
            (None, Some(err)) => Ok(RpcReply::Error(RpcFault::from_value(err))),
            (Some(other), _) => Err(CamError::Protocol(format!(
                "result is not an array: {other}"
            ))),
            (None, None) => Err(CamError::Protocol(
                "reply has neither result nor error".into()
            )),
        }
    }

    /// Unwrap the result, turning an error reply into a protocol error.
    pub fn into_result(self, method: &str) -> Result<Vec<Value>> {
        match self {
            RpcReply::Result(items) => Ok(items),
            RpcReply::Error(fault) => Err(CamError::Protocol(format!("{method} failed: {fault}"))),
        }
    }
}

/// Decode a result array into the shape documented for `method`.
pub fn decode_result<R: DeserializeOwned>(method: &str, result: Vec<Value>) -> Result<R> {
    serde_json::from_value(Value::Array(result))
        .map_err(|e| CamError::Protocol(format!("{method}: unexpected result shape: {e}")))
}

/// Sends requests to a resolved endpoint.
#[derive(Clone)]
pub struct RpcClient {
    endpoint:  Endpoint,
    transport: Arc<dyn Transport>,
}

impl RpcClient {
    pub fn new(endpoint: Endpoint, transport: Arc<dyn Transport>) -> Self {
        RpcClient { endpoint, transport }
    }

    /// Call `method` on `service` with the default id and version.
    pub async fn call(&self, service: &str, method: &str, params: Vec<Value>) -> Result<RpcReply> {
        self.send(service, &RpcRequest::new(method, params)).await
    }

    pub async fn send(&self, service: &str, req: &RpcRequest) -> Result<RpcReply> {
        let url = self.endpoint.service_url(service);
        let body = serde_json::to_vec(req)?;
        debug!("→ {url} {}", req.method);
        let reply = self.transport.post_json(&url, body).await?;
        RpcReply::decode(&reply)
    }

    /// Plain GET through the same transport (image downloads).
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.transport.get(url).await
    }
}
