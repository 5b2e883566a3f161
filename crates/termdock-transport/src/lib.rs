//! Transport selection for termdock remote operations
//!
//! Every remote call goes through the [`TransportSelector`], which prefers the
//! hosting shell's in-process bridge when one is installed and otherwise falls
//! back to a fixed local request endpoint. The selector never fails with an
//! error type: every failure class is folded into the [`RpcResponse`]
//! envelope, so callers always get a reply back.

mod host_bridge;
mod request;
mod rpc;
mod selector;

pub use host_bridge::HostBridge;
pub use request::{HttpEndpoint, RequestEndpoint};
pub use rpc::{RpcError, SessionRpc, SessionTransport};
pub use rpc::{OP_CLOSE_SESSION, OP_CREATE_SESSION, OP_RESIZE_SESSION, OP_WRITE_SESSION};
pub use selector::TransportSelector;

pub use termdock_types::RpcResponse;
