use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;

use termdock_types::{CreateSessionReply, CreateSessionRequest, GridSize, RpcResponse};

use crate::selector::TransportSelector;

pub const OP_CREATE_SESSION: &str = "createSession";
pub const OP_CLOSE_SESSION: &str = "closeSession";
pub const OP_WRITE_SESSION: &str = "writeSession";
pub const OP_RESIZE_SESSION: &str = "resizeSession";

/// Failure of a typed remote operation.
///
/// Transport failures arrive here too, since the selector folds them into
/// the reply envelope before this layer decodes it.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("{endpoint} rejected (code {code}): {message}")]
    Rejected {
        endpoint: &'static str,
        code: i32,
        message: String,
    },
    #[error("{endpoint} returned a malformed payload: {source}")]
    Malformed {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// The four remote operations of the session bridge.
///
/// Sessions depend on this seam rather than on a concrete transport, so
/// tests can substitute a recording fake.
#[async_trait]
pub trait SessionTransport: Send + Sync {
    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<CreateSessionReply, RpcError>;

    async fn close_session(&self, instance_id: &str) -> Result<bool, RpcError>;

    async fn write_session(&self, instance_id: &str, data: &str) -> Result<bool, RpcError>;

    async fn resize_session(
        &self,
        instance_id: &str,
        size: GridSize,
    ) -> Result<bool, RpcError>;
}

/// Production [`SessionTransport`] going through the transport selector
pub struct SessionRpc {
    selector: Arc<TransportSelector>,
}

impl SessionRpc {
    pub fn new(selector: Arc<TransportSelector>) -> Self {
        Self { selector }
    }

    fn decode<T: DeserializeOwned>(
        endpoint: &'static str,
        reply: RpcResponse,
    ) -> Result<T, RpcError> {
        if !reply.success {
            return Err(RpcError::Rejected {
                endpoint,
                code: reply.code,
                message: reply.error_text(),
            });
        }
        serde_json::from_value(reply.data.unwrap_or(serde_json::Value::Null))
            .map_err(|source| RpcError::Malformed { endpoint, source })
    }
}

#[async_trait]
impl SessionTransport for SessionRpc {
    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<CreateSessionReply, RpcError> {
        // CreateSessionRequest serializes without fallible fields
        let params = serde_json::to_value(request).unwrap_or(serde_json::Value::Null);
        let reply = self.selector.send(OP_CREATE_SESSION, params).await;
        Self::decode(OP_CREATE_SESSION, reply)
    }

    async fn close_session(&self, instance_id: &str) -> Result<bool, RpcError> {
        let params = json!({ "instance_id": instance_id });
        let reply = self.selector.send(OP_CLOSE_SESSION, params).await;
        Self::decode(OP_CLOSE_SESSION, reply)
    }

    async fn write_session(&self, instance_id: &str, data: &str) -> Result<bool, RpcError> {
        let params = json!({ "instance_id": instance_id, "data": data });
        let reply = self.selector.send(OP_WRITE_SESSION, params).await;
        Self::decode(OP_WRITE_SESSION, reply)
    }

    async fn resize_session(
        &self,
        instance_id: &str,
        size: GridSize,
    ) -> Result<bool, RpcError> {
        let params = json!({
            "instance_id": instance_id,
            "rows": size.rows,
            "cols": size.cols,
        });
        let reply = self.selector.send(OP_RESIZE_SESSION, params).await;
        Self::decode(OP_RESIZE_SESSION, reply)
    }
}
