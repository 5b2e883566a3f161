/// Handle onto the external terminal emulation surface.
///
/// Rendering and input capture live outside the bridge; the controller only
/// needs a sink for remote output, grid accessors, a way to recompute the
/// grid from the bound layout surface, and disposal on teardown. At most one
/// handle binds to a session at a time.
pub trait EmulatorHandle: Send {
    /// Feed remote output into the grid
    fn write(&mut self, text: &str);

    fn rows(&self) -> u16;

    fn cols(&self) -> u16;

    /// Recompute the grid from the current layout metrics
    fn fit(&mut self);

    fn scroll_to_bottom(&mut self);

    /// Release the rendering surface; called once during teardown
    fn dispose(&mut self);
}
