use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use log::{debug, warn};
use serde_json::Value;

use termdock_types::{RpcResponse, BRIDGE_WARMUP_DELAY, CODE_TRANSPORT_ERROR, CODE_UNSUPPORTED};

use crate::host_bridge::HostBridge;
use crate::request::RequestEndpoint;

/// Picks the transport for each remote call.
///
/// The host bridge wins whenever one is installed at call time; otherwise the
/// call goes over the request endpoint. No retries happen here, and nothing
/// escapes as an error: every failure becomes a failure envelope.
pub struct TransportSelector {
    bridge: RwLock<Option<Arc<dyn HostBridge>>>,
    endpoint: Arc<dyn RequestEndpoint>,
    created_at: Instant,
    warmup: Duration,
}

impl TransportSelector {
    pub fn new(endpoint: Arc<dyn RequestEndpoint>) -> Self {
        Self {
            bridge: RwLock::new(None),
            endpoint,
            created_at: Instant::now(),
            warmup: BRIDGE_WARMUP_DELAY,
        }
    }

    /// Override the warm-up delay applied before the first call
    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    /// Install the hosting shell's bridge surface.
    ///
    /// The shell may call this at any point after load; subsequent calls
    /// replace the previous surface.
    pub fn install_host_bridge(&self, bridge: Arc<dyn HostBridge>) {
        *self.bridge.write().unwrap() = Some(bridge);
    }

    /// True when a host bridge surface is currently installed
    pub fn host_bridge_present(&self) -> bool {
        self.bridge.read().unwrap().is_some()
    }

    /// Send one remote call, returning the reply envelope.
    ///
    /// The bridge presence check runs per call: the shell may inject its
    /// surface after initial load, so the first call waits out a short
    /// warm-up window before probing.
    pub async fn send(&self, endpoint_name: &str, params: Value) -> RpcResponse {
        let elapsed = self.created_at.elapsed();
        if elapsed < self.warmup {
            tokio::time::sleep(self.warmup - elapsed).await;
        }

        let bridge = self.bridge.read().unwrap().clone();
        if let Some(bridge) = bridge {
            if !bridge.supports(endpoint_name) {
                debug!("host bridge does not expose {endpoint_name}, reporting unsupported");
                return RpcResponse::failure(
                    CODE_UNSUPPORTED,
                    format!("host bridge does not expose {endpoint_name}"),
                );
            }
            return match bridge.call(endpoint_name, params) {
                Ok(reply) => reply,
                Err(err) => {
                    warn!("host bridge call {endpoint_name} failed: {err}");
                    RpcResponse::failure(CODE_TRANSPORT_ERROR, err.to_string())
                }
            };
        }

        match self.endpoint.request(endpoint_name, params).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!("request endpoint call {endpoint_name} failed: {err}");
                RpcResponse::failure(CODE_TRANSPORT_ERROR, err.to_string())
            }
        }
    }
}
