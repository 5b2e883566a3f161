use termdock_types::{ConnectionStatus, RemoteState};

/// Inputs to one reconciliation step, scoped to the signal that fired.
///
/// A remote lifecycle push sets the remote flags from the reported state; a
/// local attach sets only `locally_attached`. Flags describe the signal, not
/// accumulated history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalFlags {
    pub remote_stopped: bool,
    pub remote_running: bool,
    pub locally_attached: bool,
}

impl SignalFlags {
    pub fn from_remote(state: RemoteState) -> Self {
        Self {
            remote_stopped: state.is_terminal(),
            remote_running: state == RemoteState::Running,
            locally_attached: false,
        }
    }

    pub fn local_attach() -> Self {
        Self {
            locally_attached: true,
            ..Self::default()
        }
    }
}

/// Total merge of the two asynchronous state sources.
///
/// Remote termination always wins, even over `Ready`; a running report wins
/// next; a local attach promotes to `Ready`; any other signal keeps the
/// previous status.
pub fn reconcile(previous: ConnectionStatus, flags: SignalFlags) -> ConnectionStatus {
    if flags.remote_stopped {
        ConnectionStatus::Disconnected
    } else if flags.remote_running {
        ConnectionStatus::Connected
    } else if flags.locally_attached {
        ConnectionStatus::Ready
    } else {
        previous
    }
}
