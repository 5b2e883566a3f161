use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use uuid::Uuid;

use termdock_bus::{EventBus, HandlerId};
use termdock_transport::SessionTransport;
use termdock_types::{
    ConnectionStatus, CreateSessionRequest, EventKind, GeometrySample, GridSize,
    TerminalEventBody, TERMINAL_EVENT,
};

use crate::emulator::EmulatorHandle;
use crate::reconcile::{reconcile, SignalFlags};

struct SessionState {
    instance_id: Option<String>,
    status: ConnectionStatus,
    last_error: Option<String>,
    attached: bool,
    emulator: Option<Box<dyn EmulatorHandle>>,
    created_at: Option<DateTime<Utc>>,
}

/// Owns one logical terminal session across its whole lifecycle.
///
/// No public operation fails with an error type: wrong-state calls and double
/// binds are expected races handled as logged no-ops, and transport failures
/// land in `last_error`. Only explicit lifecycle events move the connection
/// status; in particular a failed write or resize does not imply the remote
/// process died.
pub struct TerminalSessionController {
    transport: Arc<dyn SessionTransport>,
    state: Mutex<SessionState>,
}

impl TerminalSessionController {
    pub fn new(transport: Arc<dyn SessionTransport>) -> Self {
        Self {
            transport,
            state: Mutex::new(SessionState {
                instance_id: None,
                status: ConnectionStatus::Disconnected,
                last_error: None,
                attached: false,
                emulator: None,
                created_at: None,
            }),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state.lock().unwrap().status
    }

    pub fn instance_id(&self) -> Option<String> {
        self.state.lock().unwrap().instance_id.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.lock().unwrap().last_error.clone()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().unwrap().created_at
    }

    /// Request a new remote session.
    ///
    /// A no-op while the session is connected or ready. Success records the
    /// instance id only; the status stays put until the remote confirms with
    /// a `running` push.
    pub async fn create(&self, mut request: CreateSessionRequest) {
        {
            let state = self.state.lock().unwrap();
            if state.status != ConnectionStatus::Disconnected {
                warn!("create ignored: session already {}", state.status);
                return;
            }
        }

        if request.instance_id.is_none() {
            request.instance_id = Some(Uuid::new_v4().to_string());
        }
        if request.size.is_none() {
            request.size = Some(GridSize::default());
        }

        match self.transport.create_session(&request).await {
            Ok(reply) => {
                let mut state = self.state.lock().unwrap();
                debug!(
                    "session {} requested, awaiting remote confirmation",
                    reply.instance_id
                );
                state.instance_id = Some(reply.instance_id);
                state.created_at = Some(Utc::now());
                state.last_error = None;
            }
            Err(err) => self.record_error(format!("create failed: {err}")),
        }
    }

    /// Request remote termination.
    ///
    /// The status drops to disconnected immediately regardless of the reply,
    /// since the session is being asked to end either way. A no-op when
    /// already disconnected.
    pub async fn close(&self) {
        let instance_id = {
            let mut state = self.state.lock().unwrap();
            if state.status == ConnectionStatus::Disconnected {
                debug!("close ignored: already disconnected");
                return;
            }
            let Some(instance_id) = state.instance_id.clone() else {
                debug!("close ignored: no instance id recorded");
                return;
            };
            state.status = ConnectionStatus::Disconnected;
            instance_id
        };

        if let Err(err) = self.transport.close_session(&instance_id).await {
            self.record_error(format!("close failed: {err}"));
        }
    }

    /// Forward bytes to the remote pseudo-terminal.
    ///
    /// Ignored with a warning unless connected or ready. A transport failure
    /// is recorded but does not change the connection status.
    pub async fn write(&self, data: &str) {
        let Some(instance_id) = self.writable_instance("write") else {
            return;
        };
        if let Err(err) = self.transport.write_session(&instance_id, data).await {
            self.record_error(format!("write failed: {err}"));
        }
    }

    /// Push an authoritative grid size to the remote pseudo-terminal.
    ///
    /// Same non-fatal treatment as `write`.
    pub async fn resize(&self, rows: u16, cols: u16) {
        let Some(instance_id) = self.writable_instance("resize") else {
            return;
        };
        let size = GridSize { rows, cols };
        if let Err(err) = self.transport.resize_session(&instance_id, size).await {
            self.record_error(format!("resize failed: {err}"));
        }
    }

    /// Sink for the emulator's input callbacks.
    ///
    /// Keystrokes are forwarded only while the session is ready.
    pub async fn handle_input(&self, data: &str) {
        if self.status() != ConnectionStatus::Ready {
            debug!("input dropped: session not ready");
            return;
        }
        self.write(data).await;
    }

    /// Apply one remote push to this session.
    ///
    /// Events for any instance id other than the current one are stale
    /// cross-talk from a prior incarnation and are discarded. Output goes to
    /// the bound emulator in arrival order; lifecycle changes go through the
    /// reconciliation function.
    pub fn on_remote_event(&self, event: &TerminalEventBody) {
        let mut state = self.state.lock().unwrap();
        let matches_current = state
            .instance_id
            .as_deref()
            .map(|current| current == event.instance_id())
            .unwrap_or(false);
        if !matches_current {
            debug!(
                "discarding event for stale instance {}",
                event.instance_id()
            );
            return;
        }

        match event {
            TerminalEventBody::Output { text, .. } => {
                if let Some(emulator) = state.emulator.as_mut() {
                    emulator.write(text);
                    emulator.scroll_to_bottom();
                }
            }
            TerminalEventBody::StateChanged {
                old_state,
                new_state,
                ..
            } => {
                let next = reconcile(state.status, SignalFlags::from_remote(*new_state));
                if next != state.status {
                    info!(
                        "session {} {} -> {} (remote {:?} -> {:?})",
                        event.instance_id(),
                        state.status,
                        next,
                        old_state,
                        new_state
                    );
                    state.status = next;
                }
            }
        }
    }

    /// Bind the rendering surface and fire the local attach transition.
    ///
    /// At most one emulator binds per session; a second bind without an
    /// intervening teardown is rejected, not replaced.
    pub fn bind_emulator(&self, emulator: Box<dyn EmulatorHandle>) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.attached {
            warn!("emulator already bound, rejecting second bind");
            return false;
        }
        state.attached = true;
        state.emulator = Some(emulator);
        let next = reconcile(state.status, SignalFlags::local_attach());
        if next != state.status {
            info!("session surface attached, {} -> {}", state.status, next);
            state.status = next;
        }
        true
    }

    /// Release the session's local resources. Idempotent.
    pub fn teardown(&self) {
        let mut state = self.state.lock().unwrap();
        if let Some(mut emulator) = state.emulator.take() {
            emulator.dispose();
        }
        state.attached = false;
        if state.status != ConnectionStatus::Disconnected {
            info!("session torn down from {}", state.status);
            state.status = ConnectionStatus::Disconnected;
        }
    }

    /// Recompute the emulator grid from current layout metrics and read back
    /// the resulting sample; `None` when no emulator is bound.
    pub fn refit(&self) -> Option<GeometrySample> {
        let mut state = self.state.lock().unwrap();
        let emulator = state.emulator.as_mut()?;
        emulator.fit();
        Some(GeometrySample {
            rows: emulator.rows(),
            cols: emulator.cols(),
        })
    }

    /// Subscribe this controller to terminal events on the bus.
    ///
    /// Returns the handler identity so the owning UI can unregister it on
    /// teardown.
    pub fn attach_to_bus(self: &Arc<Self>, bus: &EventBus) -> HandlerId {
        let controller = Arc::clone(self);
        bus.register(TERMINAL_EVENT, move |event| {
            if let EventKind::Terminal(body) = EventKind::classify(event)? {
                controller.on_remote_event(&body);
            }
            Ok(())
        })
    }

    fn writable_instance(&self, operation: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        if !matches!(
            state.status,
            ConnectionStatus::Connected | ConnectionStatus::Ready
        ) {
            warn!("{operation} ignored: session is {}", state.status);
            return None;
        }
        match state.instance_id.clone() {
            Some(instance_id) => Some(instance_id),
            None => {
                warn!("{operation} ignored: no instance id recorded");
                None
            }
        }
    }

    fn record_error(&self, message: String) {
        warn!("{message}");
        self.state.lock().unwrap().last_error = Some(message);
    }
}
