//! JSON-RPC over HTTP with endpoint failover

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::warn;

/// Outcome of one JSON-RPC attempt
enum Attempt<T> {
    Done(T),
    /// The node answered with a JSON-RPC error; another endpoint would not help
    Rejected(Error),
    /// Transport failure; worth retrying on the next endpoint
    Unreachable(Error),
}

/// HTTP RPC client with failover support
///
/// Transport failures rotate to the next endpoint; an error object returned
/// by a node is surfaced immediately.
#[derive(Clone)]
pub struct RpcClient {
    urls: Arc<Vec<String>>,
    client: reqwest::Client,
    current_index: Arc<AtomicUsize>,
    next_id: Arc<AtomicU64>,
}

impl RpcClient {
    /// Create a new RPC client with failover URLs
    pub fn new(urls: Vec<String>, timeout: Duration) -> Result<Self> {
        if urls.is_empty() {
            return Err(Error::InvalidConfig("At least one RPC URL required".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Rpc(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            urls: Arc::new(urls),
            client,
            current_index: Arc::new(AtomicUsize::new(0)),
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Endpoint currently in use
    pub fn current_url(&self) -> &str {
        let idx = self.current_index.load(Ordering::Relaxed);
        &self.urls[idx % self.urls.len()]
    }

    fn rotate_url(&self) {
        self.current_index.fetch_add(1, Ordering::Relaxed);
    }

    /// Make a JSON-RPC request, trying each endpoint at most once
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        let mut last_error = None;

        for _ in 0..self.urls.len() {
            let url = self.current_url().to_string();

            match self.attempt(&url, method, &params).await {
                Attempt::Done(result) => return Ok(result),
                Attempt::Rejected(e) => return Err(e),
                Attempt::Unreachable(e) => {
                    warn!(url = %url, method, error = %e, "RPC endpoint failed, rotating");
                    last_error = Some(e);
                    self.rotate_url();
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Rpc("All RPC endpoints failed".into())))
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        url: &str,
        method: &str,
        params: &serde_json::Value,
    ) -> Attempt<T> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
        });

        let response = match self.client.post(url).json(&body).send().await {
            Ok(response) => response,
            Err(e) => return Attempt::Unreachable(Error::Rpc(format!("{}: {}", method, e))),
        };

        let mut reply: serde_json::Value = match response.json().await {
            Ok(reply) => reply,
            Err(e) => {
                return Attempt::Unreachable(Error::Rpc(format!(
                    "{}: unreadable response: {}",
                    method, e
                )));
            }
        };

        if let Some(error) = reply.get("error") {
            return Attempt::Rejected(Error::ChainError(format!("{} returned {}", method, error)));
        }

        match reply.get_mut("result").map(serde_json::Value::take) {
            Some(result) => match serde_json::from_value(result) {
                Ok(value) => Attempt::Done(value),
                Err(e) => Attempt::Rejected(Error::Rpc(format!(
                    "{}: unexpected result: {}",
                    method, e
                ))),
            },
            None => Attempt::Unreachable(Error::Rpc(format!("{}: missing result", method))),
        }
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("urls", &self.urls)
            .field("current_index", &self.current_index.load(Ordering::Relaxed))
            .finish()
    }
}
