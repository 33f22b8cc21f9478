//! Application callbacks and the context they receive

use crate::gfx::GraphicsBackend;

use super::platform::Platform;

/// What an update asks the engine to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    /// Keep running; call update again next frame
    InProgress,
    /// Stop the loop; no further update follows
    Done,
}

/// Client code driven by the engine
///
/// The engine calls [`init`](Self::init) exactly once, then
/// [`update`](Self::update) once per frame until it returns
/// [`UpdateStatus::Done`] or fails (or the window closes), then
/// [`shutdown`](Self::shutdown) exactly once.
pub trait Application {
    /// Constructs the resources the session needs. An error aborts startup.
    fn init(&mut self, ctx: &mut EngineContext<'_>) -> anyhow::Result<()>;

    fn update(&mut self, ctx: &mut EngineContext<'_>) -> anyhow::Result<UpdateStatus>;

    fn shutdown(&mut self, ctx: &mut EngineContext<'_>);
}

/// Engine state handed to every callback
pub struct EngineContext<'a> {
    graphics: &'a mut dyn GraphicsBackend,
    platform: &'a Platform,
    frame: u64,
}

impl<'a> EngineContext<'a> {
    pub fn new(graphics: &'a mut dyn GraphicsBackend, platform: &'a Platform, frame: u64) -> Self {
        Self {
            graphics,
            platform,
            frame,
        }
    }

    /// The graphics backend to construct resources and submit command buffers on
    pub fn graphics(&mut self) -> &mut (dyn GraphicsBackend + 'a) {
        &mut *self.graphics
    }

    pub fn platform(&self) -> &Platform {
        self.platform
    }

    /// Index of the current frame (0 during init and the first update)
    pub fn frame(&self) -> u64 {
        self.frame
    }
}
