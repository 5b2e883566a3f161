use std::sync::{Arc, Mutex};

use log::debug;

use termdock_types::GeometrySample;

use crate::controller::TerminalSessionController;

type SizeCallback = Box<dyn Fn(GeometrySample) + Send + Sync>;

/// Keeps the remote grid in step with the rendering surface.
///
/// The owning UI wires [`GeometrySynchronizer::on_layout_change`] into its
/// layout observer. Each callback refits the emulator grid, reads back the
/// sample, and pushes it downstream only when it differs from the previously
/// pushed one. That comparison is the sole defense against resize feedback
/// loops, so it runs before anything else.
pub struct GeometrySynchronizer {
    controller: Arc<TerminalSessionController>,
    last_pushed: Mutex<Option<GeometrySample>>,
    on_change: Option<SizeCallback>,
}

impl GeometrySynchronizer {
    pub fn new(controller: Arc<TerminalSessionController>) -> Self {
        Self {
            controller,
            last_pushed: Mutex::new(None),
            on_change: None,
        }
    }

    /// Notify an external callback whenever a new sample is pushed
    pub fn with_on_change<F>(mut self, on_change: F) -> Self
    where
        F: Fn(GeometrySample) + Send + Sync + 'static,
    {
        self.on_change = Some(Box::new(on_change));
        self
    }

    /// Entry point for the layout-change observer
    pub async fn on_layout_change(&self) {
        let Some(sample) = self.controller.refit() else {
            debug!("layout change ignored: no emulator bound");
            return;
        };

        {
            let mut last = self.last_pushed.lock().unwrap();
            if last.as_ref() == Some(&sample) {
                return;
            }
            *last = Some(sample);
        }

        self.controller.resize(sample.rows, sample.cols).await;
        if let Some(on_change) = &self.on_change {
            on_change(sample);
        }
    }

    pub fn last_pushed(&self) -> Option<GeometrySample> {
        *self.last_pushed.lock().unwrap()
    }
}
