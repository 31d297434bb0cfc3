//! Per-process camera session: the resolved endpoint plus the outcome of the
//! extended-method handshake.

use log::warn;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::auth;
use crate::error::Result;
use crate::rpc::{decode_result, RpcClient, RpcReply};

pub struct Session {
    rpc:      RpcClient,
    extended: bool,
}

impl Session {
    pub fn new(rpc: RpcClient) -> Self {
        Session { rpc, extended: false }
    }

    pub fn rpc(&self) -> &RpcClient { &self.rpc }

    pub fn extended_enabled(&self) -> bool { self.extended }

    /// Unlock the extended method set.  Does nothing once it has succeeded.
    pub async fn enable_extended_methods(&mut self) -> Result<()> {
        if self.extended {
            return Ok(());
        }
        auth::negotiate(&self.rpc).await?;
        self.extended = true;
        Ok(())
    }

    pub async fn call(&self, service: &str, method: &str, params: Vec<Value>) -> Result<RpcReply> {
        if !self.extended && auth::is_extended(service, method) {
            warn!("{service}/{method} called before extended methods were enabled");
        }
        self.rpc.call(service, method, params).await
    }

    pub async fn call_typed<R: DeserializeOwned>(
        &self,
        service: &str,
        method:  &str,
        params:  Vec<Value>,
    ) -> Result<R> {
        let result = self.call(service, method, params).await?.into_result(method)?;
        decode_result(method, result)
    }
}
