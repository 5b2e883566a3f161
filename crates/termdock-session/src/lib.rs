//! Terminal session lifecycle for the termdock bridge
//!
//! One [`TerminalSessionController`] owns one logical session: it requests
//! creation and termination over the selected transport, reconciles remote
//! lifecycle pushes with the local attach signal into a single connection
//! status, routes output to the bound emulator surface, and keeps terminal
//! geometry in sync with the rendering surface.

mod controller;
mod emulator;
mod geometry;
mod reconcile;

pub use controller::TerminalSessionController;
pub use emulator::EmulatorHandle;
pub use geometry::GeometrySynchronizer;
pub use reconcile::{reconcile, SignalFlags};
