use anyhow::Result;
use serde_json::Value;

use termdock_types::RpcResponse;

/// In-process call surface exposed by the hosting desktop shell.
///
/// The shell installs an implementation at runtime, possibly after the bridge
/// has already started issuing calls; availability is therefore probed per
/// call rather than cached. A missing endpoint or a failing call is an
/// expected condition and is converted into a failure envelope by the
/// selector, never propagated.
pub trait HostBridge: Send + Sync {
    /// True when the bridge exposes the named endpoint.
    fn supports(&self, endpoint: &str) -> bool;

    /// Invoke the named endpoint synchronously.
    fn call(&self, endpoint: &str, params: Value) -> Result<RpcResponse>;
}
