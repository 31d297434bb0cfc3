//! HTTP transport for camera API calls, image downloads and SSDP
//! description documents.
//!
//! Everything that touches the network over HTTP goes through [`Transport`]
//! so the RPC, auth and capture layers can be exercised against a scripted
//! transport in tests.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use crate::error::{CamError, Result};

#[async_trait]
pub trait Transport: Send + Sync {
    /// POST a JSON body and return the raw reply body.
    async fn post_json(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>>;

    /// GET `url` and return the raw reply body.
    async fn get(&self, url: &str) -> Result<Vec<u8>>;
}

/// Production transport backed by a single `reqwest` client.
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(HttpTransport { http })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>> {
        let resp = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        read_body(url, resp).await
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.http.get(url).send().await?;
        read_body(url, resp).await
    }
}

async fn read_body(url: &str, resp: reqwest::Response) -> Result<Vec<u8>> {
    let status = resp.status();
    debug!("{url} → {status}");
    if !status.is_success() {
        return Err(CamError::Transport(format!("{url}: HTTP {}", status.as_u16())));
    }
    Ok(resp.bytes().await?.to_vec())
}

#[cfg(test)]
pub mod mock {
    //! Scripted transport: replies are keyed by URL and consumed in order.

    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Request {
        Post { url: String, body: serde_json::Value },
        Get { url: String },
    }

    #[derive(Default)]
    pub struct MockTransport {
        replies:  Mutex<HashMap<String, VecDeque<Result<Vec<u8>>>>>,
        requests: Mutex<Vec<Request>>,
    }

    impl MockTransport {
        pub fn new() -> Self { Self::default() }

        /// Queue a reply body for the next request to `url`.
        pub fn reply(&self, url: &str, body: impl Into<Vec<u8>>) -> &Self {
            self.push(url, Ok(body.into()))
        }

        /// Queue a transport failure for the next request to `url`.
        pub fn fail(&self, url: &str, msg: &str) -> &Self {
            self.push(url, Err(CamError::Transport(msg.into())))
        }

        fn push(&self, url: &str, r: Result<Vec<u8>>) -> &Self {
            self.replies
                .lock()
                .unwrap()
                .entry(url.to_string())
                .or_default()
                .push_back(r);
            self
        }

        pub fn requests(&self) -> Vec<Request> {
            self.requests.lock().unwrap().clone()
        }

        /// JSON bodies of every POST sent so far.
        pub fn posted(&self) -> Vec<serde_json::Value> {
            self.requests()
                .into_iter()
                .filter_map(|r| match r {
                    Request::Post { body, .. } => Some(body),
                    Request::Get { .. } => None,
                })
                .collect()
        }

        pub fn gets(&self) -> Vec<String> {
            self.requests()
                .into_iter()
                .filter_map(|r| match r {
                    Request::Get { url } => Some(url),
                    Request::Post { .. } => None,
                })
                .collect()
        }

        fn next(&self, url: &str) -> Result<Vec<u8>> {
            self.replies
                .lock()
                .unwrap()
                .get_mut(url)
                .and_then(|q| q.pop_front())
                .unwrap_or_else(|| Err(CamError::Transport(format!("{url}: no scripted reply"))))
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn post_json(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>> {
            let body = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
            self.requests.lock().unwrap().push(Request::Post { url: url.into(), body });
            self.next(url)
        }

        async fn get(&self, url: &str) -> Result<Vec<u8>> {
            self.requests.lock().unwrap().push(Request::Get { url: url.into() });
            self.next(url)
        }
    }
}
