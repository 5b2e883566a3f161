//! Core protocol types for the termdock session bridge
//!
//! This crate provides the wire shapes and shared constants used across the
//! transport, event bus, and session crates: the RPC reply envelope, the
//! push-event envelope and its recognized event kinds, the channel control
//! frames, and the terminal geometry types.

use anyhow::bail;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Default terminal grid used when a create request carries no size
pub const DEFAULT_ROWS: u16 = 24;
pub const DEFAULT_COLS: u16 = 80;

/// Keep-alive probe interval on the push channel
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Delay between reconnect attempts on the push channel
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Reconnect attempts allowed before the channel gives up permanently
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Grace period before the first transport call, giving the hosting shell
/// time to inject its bridge surface after initial load
pub const BRIDGE_WARMUP_DELAY: Duration = Duration::from_millis(200);

/// Fixed local request endpoint used when no host bridge is present
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9527/api/rpc";

/// Fixed local push channel address
pub const DEFAULT_EVENTS_URL: &str = "ws://127.0.0.1:9527/ws/events";

/// Wrapper event type carrying nested terminal events
pub const TERMINAL_EVENT: &str = "terminal_event";

/// Backend data synchronization notification
pub const DATA_SYNC_EVENT: &str = "data_sync";

// ============================================================================
// RPC reply envelope
// ============================================================================

/// Reply code for a locally synthesized success
pub const CODE_OK: i32 = 0;
/// The selected transport could not complete the round trip
pub const CODE_TRANSPORT_ERROR: i32 = -1;
/// The host bridge does not expose the named endpoint
pub const CODE_UNSUPPORTED: i32 = -2;

/// Uniform reply shape for every remote operation.
///
/// Transport failures are folded into this envelope rather than surfaced as
/// errors, so callers always receive one of these back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub code: i32,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RpcResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            code: CODE_OK,
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(code: i32, error: impl Into<String>) -> Self {
        Self {
            code,
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Error text for a failed reply, or a placeholder when the backend
    /// rejected without a message
    pub fn error_text(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| format!("remote call failed with code {}", self.code))
    }
}

// ============================================================================
// Session types
// ============================================================================

/// Connection state of one logical terminal session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No known running remote process
    Disconnected,
    /// Remote reports running, local surface not yet attached
    Connected,
    /// Local surface attached; the only state forwarding keystrokes
    Ready,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connected => write!(f, "connected"),
            Self::Ready => write!(f, "ready"),
        }
    }
}

/// Lifecycle states reported by the backend for a remote pseudo-terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteState {
    Starting,
    Running,
    Stopped,
    Terminated,
}

impl RemoteState {
    /// Stopped and terminated both mean the remote process is gone
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Terminated)
    }
}

/// Terminal grid dimensions in character cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub rows: u16,
    pub cols: u16,
}

impl Default for GridSize {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
        }
    }
}

/// A measured `(rows, cols)` pair from the rendering surface
pub type GeometrySample = GridSize;

/// Parameters for the createSession operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<GridSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
}

/// Payload returned by a successful createSession call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionReply {
    pub instance_id: String,
    pub status: RemoteState,
}

// ============================================================================
// Push events
// ============================================================================

/// Normalized backend push notification, identical for both transports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEvent {
    pub event_type: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

impl PushEvent {
    pub fn new(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Nested payload carried by a `terminal_event` push
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum TerminalEventBody {
    /// Output bytes from the remote pseudo-terminal
    Output { instance_id: String, text: String },
    /// Remote lifecycle transition
    StateChanged {
        instance_id: String,
        old_state: RemoteState,
        new_state: RemoteState,
    },
}

impl TerminalEventBody {
    pub fn instance_id(&self) -> &str {
        match self {
            Self::Output { instance_id, .. } => instance_id,
            Self::StateChanged { instance_id, .. } => instance_id,
        }
    }
}

/// Closed classification of recognized push events
#[derive(Debug, Clone)]
pub enum EventKind {
    Terminal(TerminalEventBody),
    DataSync(Value),
    Other { event_type: String, data: Value },
}

impl EventKind {
    /// Classify a normalized push event into a recognized kind.
    ///
    /// Fails only when a `terminal_event` wrapper carries a payload that does
    /// not decode as a terminal event.
    pub fn classify(event: &PushEvent) -> anyhow::Result<Self> {
        match event.event_type.as_str() {
            TERMINAL_EVENT => Ok(Self::Terminal(serde_json::from_value(event.data.clone())?)),
            DATA_SYNC_EVENT => Ok(Self::DataSync(event.data.clone())),
            other => Ok(Self::Other {
                event_type: other.to_string(),
                data: event.data.clone(),
            }),
        }
    }
}

// ============================================================================
// Channel frames
// ============================================================================

/// One frame on the push channel: either a keep-alive control frame or a
/// normalized push event
#[derive(Debug, Clone)]
pub enum ChannelFrame {
    Ping,
    Pong,
    Event(PushEvent),
}

impl ChannelFrame {
    /// Parse an inbound text frame.
    ///
    /// Control frames are `{"type":"ping"}` / `{"type":"pong"}`; anything
    /// carrying an `event_type` is a push event. Everything else is rejected
    /// as malformed.
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        match value.get("type").and_then(Value::as_str) {
            Some("ping") => Ok(Self::Ping),
            Some("pong") => Ok(Self::Pong),
            _ if value.get("event_type").is_some() => {
                Ok(Self::Event(serde_json::from_value(value)?))
            }
            _ => bail!("frame carries neither a control type nor an event_type"),
        }
    }

    /// Encode an outbound frame as JSON text
    pub fn encode(&self) -> String {
        match self {
            Self::Ping => r#"{"type":"ping"}"#.to_string(),
            Self::Pong => r#"{"type":"pong"}"#.to_string(),
            // PushEvent has no non-serializable fields
            Self::Event(event) => serde_json::to_string(event).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn channel_frame_parses_controls_and_events() {
        assert!(matches!(
            ChannelFrame::parse(r#"{"type":"ping"}"#).unwrap(),
            ChannelFrame::Ping
        ));
        assert!(matches!(
            ChannelFrame::parse(r#"{"type":"pong"}"#).unwrap(),
            ChannelFrame::Pong
        ));

        let frame = ChannelFrame::parse(
            r#"{"event_type":"data_sync","data":{"scope":"plugins"},"timestamp":"2026-01-05T10:00:00Z"}"#,
        )
        .unwrap();
        match frame {
            ChannelFrame::Event(event) => assert_eq!(event.event_type, DATA_SYNC_EVENT),
            other => panic!("expected event frame, got {:?}", other),
        }
    }

    #[test]
    fn channel_frame_rejects_unrecognized_json() {
        assert!(ChannelFrame::parse(r#"{"hello":"world"}"#).is_err());
        assert!(ChannelFrame::parse("not json").is_err());
    }

    #[test]
    fn terminal_event_body_decodes_output_and_state_changed() {
        let output: TerminalEventBody = serde_json::from_value(json!({
            "instance_id": "t1",
            "event_type": "output",
            "text": "file.txt\n",
        }))
        .unwrap();
        assert_eq!(
            output,
            TerminalEventBody::Output {
                instance_id: "t1".to_string(),
                text: "file.txt\n".to_string(),
            }
        );

        let state: TerminalEventBody = serde_json::from_value(json!({
            "instance_id": "t1",
            "event_type": "state_changed",
            "old_state": "starting",
            "new_state": "running",
        }))
        .unwrap();
        assert_eq!(state.instance_id(), "t1");
        match state {
            TerminalEventBody::StateChanged { new_state, .. } => {
                assert_eq!(new_state, RemoteState::Running);
            }
            other => panic!("expected state_changed, got {:?}", other),
        }
    }

    #[test]
    fn event_kind_classifies_by_event_type() {
        let event = PushEvent::new(
            TERMINAL_EVENT,
            json!({"instance_id": "t1", "event_type": "output", "text": "hi"}),
        );
        assert!(matches!(
            EventKind::classify(&event).unwrap(),
            EventKind::Terminal(TerminalEventBody::Output { .. })
        ));

        let event = PushEvent::new(DATA_SYNC_EVENT, json!({"scope": "settings"}));
        assert!(matches!(
            EventKind::classify(&event).unwrap(),
            EventKind::DataSync(_)
        ));

        let event = PushEvent::new("plugin_installed", json!({}));
        assert!(matches!(
            EventKind::classify(&event).unwrap(),
            EventKind::Other { .. }
        ));

        let event = PushEvent::new(TERMINAL_EVENT, json!({"event_type": "unknown"}));
        assert!(EventKind::classify(&event).is_err());
    }

    #[test]
    fn rpc_response_failure_carries_error_text() {
        let reply = RpcResponse::failure(CODE_TRANSPORT_ERROR, "connection refused");
        assert!(!reply.success);
        assert_eq!(reply.error_text(), "connection refused");

        let silent = RpcResponse {
            code: 500,
            success: false,
            data: None,
            error: None,
        };
        assert_eq!(silent.error_text(), "remote call failed with code 500");
    }
}
