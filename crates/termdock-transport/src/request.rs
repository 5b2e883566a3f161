use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use termdock_types::{RpcResponse, DEFAULT_RPC_URL};

/// Request/response path over the network channel.
///
/// This is the fallback when no host bridge is installed. It is a plain round
/// trip, distinct from the push channel owned by the event bus.
#[async_trait]
pub trait RequestEndpoint: Send + Sync {
    async fn request(&self, endpoint: &str, params: Value) -> Result<RpcResponse>;
}

/// HTTP implementation posting to the fixed local request endpoint
pub struct HttpEndpoint {
    client: reqwest::Client,
    url: String,
}

impl HttpEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

impl Default for HttpEndpoint {
    fn default() -> Self {
        Self::new(DEFAULT_RPC_URL)
    }
}

#[async_trait]
impl RequestEndpoint for HttpEndpoint {
    async fn request(&self, endpoint: &str, params: Value) -> Result<RpcResponse> {
        let payload = json!({
            "endpoint": endpoint,
            "params": params,
        });

        let response = self.client.post(&self.url).json(&payload).send().await?;
        if !response.status().is_success() {
            bail!("request endpoint returned HTTP {}", response.status());
        }

        Ok(response.json().await?)
    }
}
