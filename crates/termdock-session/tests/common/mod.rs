use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use termdock_session::EmulatorHandle;
use termdock_transport::{RpcError, SessionTransport};
use termdock_types::{CreateSessionReply, CreateSessionRequest, GridSize, RemoteState};

/// One recorded remote operation
#[derive(Debug, Clone)]
pub enum Call {
    Create(CreateSessionRequest),
    Close(String),
    Write(String, String),
    Resize(String, u16, u16),
}

/// Recording transport fake; individual operations can be told to fail
pub struct MockTransport {
    pub calls: Mutex<Vec<Call>>,
    pub fail_create: AtomicBool,
    pub fail_close: AtomicBool,
    pub fail_write: AtomicBool,
    pub fail_resize: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail_create: AtomicBool::new(false),
            fail_close: AtomicBool::new(false),
            fail_write: AtomicBool::new(false),
            fail_resize: AtomicBool::new(false),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn rejected(endpoint: &'static str) -> RpcError {
        RpcError::Rejected {
            endpoint,
            code: 500,
            message: "mock transport failure".to_string(),
        }
    }
}

#[async_trait]
impl SessionTransport for MockTransport {
    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<CreateSessionReply, RpcError> {
        self.calls.lock().unwrap().push(Call::Create(request.clone()));
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Self::rejected("createSession"));
        }
        Ok(CreateSessionReply {
            instance_id: request
                .instance_id
                .clone()
                .unwrap_or_else(|| "generated".to_string()),
            status: RemoteState::Starting,
        })
    }

    async fn close_session(&self, instance_id: &str) -> Result<bool, RpcError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Close(instance_id.to_string()));
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(Self::rejected("closeSession"));
        }
        Ok(true)
    }

    async fn write_session(&self, instance_id: &str, data: &str) -> Result<bool, RpcError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Write(instance_id.to_string(), data.to_string()));
        if self.fail_write.load(Ordering::SeqCst) {
            return Err(Self::rejected("writeSession"));
        }
        Ok(true)
    }

    async fn resize_session(
        &self,
        instance_id: &str,
        size: GridSize,
    ) -> Result<bool, RpcError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Resize(instance_id.to_string(), size.rows, size.cols));
        if self.fail_resize.load(Ordering::SeqCst) {
            return Err(Self::rejected("resizeSession"));
        }
        Ok(true)
    }
}

/// Probe state shared with a boxed [`MockEmulator`]
#[derive(Clone)]
pub struct EmulatorProbe {
    pub writes: Arc<Mutex<Vec<String>>>,
    pub size: Arc<Mutex<GridSize>>,
    pub fits: Arc<AtomicUsize>,
    pub disposals: Arc<AtomicUsize>,
}

impl EmulatorProbe {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self {
            writes: Arc::new(Mutex::new(Vec::new())),
            size: Arc::new(Mutex::new(GridSize { rows, cols })),
            fits: Arc::new(AtomicUsize::new(0)),
            disposals: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_size(&self, rows: u16, cols: u16) {
        *self.size.lock().unwrap() = GridSize { rows, cols };
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    pub fn handle(&self) -> Box<dyn EmulatorHandle> {
        Box::new(MockEmulator {
            probe: self.clone(),
        })
    }
}

pub struct MockEmulator {
    probe: EmulatorProbe,
}

impl EmulatorHandle for MockEmulator {
    fn write(&mut self, text: &str) {
        self.probe.writes.lock().unwrap().push(text.to_string());
    }

    fn rows(&self) -> u16 {
        self.probe.size.lock().unwrap().rows
    }

    fn cols(&self) -> u16 {
        self.probe.size.lock().unwrap().cols
    }

    fn fit(&mut self) {
        self.probe.fits.fetch_add(1, Ordering::SeqCst);
    }

    fn scroll_to_bottom(&mut self) {}

    fn dispose(&mut self) {
        self.probe.disposals.fetch_add(1, Ordering::SeqCst);
    }
}
