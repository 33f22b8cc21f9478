//! Engine lifecycle state machine
//!
//! The [`Engine`] owns the application and guarantees callback ordering:
//! `init` once, `update` until done, `shutdown` once. Drivers (the winit
//! runner and the headless loop) only decide *when* to call it.

use thiserror::Error;
use tracing::{error, info, warn};

use crate::gfx::{GraphicsBackend, HeadlessBackend};

use super::config::{AppConfig, BackendKind};
use super::lifecycle::{Application, EngineContext, UpdateStatus};
use super::platform::Platform;

/// Where the engine is in the application lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed, `init` not yet called
    Created,
    /// `init` succeeded, updates allowed
    Running,
    /// Loop ended (done, failure or external stop), waiting for shutdown
    Stopped,
    /// `shutdown` has run (or was skipped because init never ran)
    ShutDown,
}

/// Errors reported by the engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("application init failed: {0:#}")]
    Init(anyhow::Error),

    #[error("application update failed on frame {frame}: {source:#}")]
    Update { frame: u64, source: anyhow::Error },

    #[error("cannot {action} while the engine is {state:?}")]
    Lifecycle {
        action: &'static str,
        state: LifecycleState,
    },

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("graphics backend unavailable: {0:#}")]
    Backend(anyhow::Error),
}

/// Drives one [`Application`] through its lifecycle
pub struct Engine {
    config: AppConfig,
    app: Box<dyn Application>,
    state: LifecycleState,
    frame: u64,
}

impl Engine {
    /// Creates an engine for the given configuration and application
    pub fn new(config: AppConfig, app: Box<dyn Application>) -> Self {
        info!(profile = %config.profile, "Constructing engine");
        info!(?config.window, "Window configuration");

        Self {
            config,
            app,
            state: LifecycleState::Created,
            frame: 0,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Number of completed updates
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Runs the application's `init`
    pub fn init(
        &mut self,
        graphics: &mut dyn GraphicsBackend,
        platform: &Platform,
    ) -> Result<(), EngineError> {
        self.expect_state(LifecycleState::Created, "init")?;

        info!(backend = graphics.name(), "Initializing application");
        let mut ctx = EngineContext::new(graphics, platform, self.frame);
        match self.app.init(&mut ctx) {
            Ok(()) => {
                self.state = LifecycleState::Running;
                Ok(())
            }
            Err(e) => {
                self.state = LifecycleState::Stopped;
                Err(EngineError::Init(e))
            }
        }
    }

    /// Runs one `update`
    ///
    /// Returning `Done` or an error stops the engine; any further update is a
    /// lifecycle error and does not reach the application.
    pub fn update(
        &mut self,
        graphics: &mut dyn GraphicsBackend,
        platform: &Platform,
    ) -> Result<UpdateStatus, EngineError> {
        self.expect_state(LifecycleState::Running, "update")?;

        let frame = self.frame;
        let mut ctx = EngineContext::new(graphics, platform, frame);
        let result = self.app.update(&mut ctx);
        self.frame += 1;

        match result {
            Ok(UpdateStatus::InProgress) => Ok(UpdateStatus::InProgress),
            Ok(UpdateStatus::Done) => {
                info!(frame, "Application requested termination");
                self.state = LifecycleState::Stopped;
                Ok(UpdateStatus::Done)
            }
            Err(source) => {
                self.state = LifecycleState::Stopped;
                Err(EngineError::Update { frame, source })
            }
        }
    }

    /// External stop request (window closed, frame limit reached)
    pub fn stop(&mut self) {
        if self.state == LifecycleState::Running {
            info!(frame = self.frame, "Stop requested");
            self.state = LifecycleState::Stopped;
        }
    }

    /// Runs the application's `shutdown`, exactly once
    ///
    /// A still-running engine is stopped first.
    pub fn shutdown(
        &mut self,
        graphics: &mut dyn GraphicsBackend,
        platform: &Platform,
    ) -> Result<(), EngineError> {
        self.stop();
        self.expect_state(LifecycleState::Stopped, "shut down")?;

        let mut ctx = EngineContext::new(graphics, platform, self.frame);
        self.app.shutdown(&mut ctx);
        self.state = LifecycleState::ShutDown;
        info!(frames = self.frame, "Application shut down");
        Ok(())
    }

    /// Ends an engine whose `init` never ran; no callback is invoked
    pub fn abandon(&mut self) {
        if self.state == LifecycleState::Created {
            warn!("Engine abandoned before init");
            self.state = LifecycleState::ShutDown;
        }
    }

    /// Runs the engine to completion with the configured backend
    pub fn run(self) -> Result<(), EngineError> {
        match self.config.graphics.backend {
            BackendKind::Wgpu => super::runner::run_windowed(self),
            BackendKind::Headless => {
                let mut engine = self;
                let (width, height) = engine.config.window.size();
                let mut backend = HeadlessBackend::new(width, height).with_frame_log(1);
                let mut platform = Platform::new(width, height);
                let max_frames = engine.config.graphics.headless_frames;
                engine.run_headless(&mut backend, &mut platform, Some(max_frames), |_, _| {})?;

                info!(
                    submitted = backend.submitted(),
                    draws = backend.last_frame().map_or(0, |f| f.draw_count()),
                    "Headless run finished"
                );
                Ok(())
            }
        }
    }

    /// Runs the whole lifecycle without a window
    ///
    /// `before_frame` is called ahead of every update with the frame index and
    /// may inject input. After `max_frames` updates the loop is stopped as if
    /// the window had been closed. Returns the number of updates made.
    pub fn run_headless<F>(
        &mut self,
        graphics: &mut dyn GraphicsBackend,
        platform: &mut Platform,
        max_frames: Option<u64>,
        mut before_frame: F,
    ) -> Result<u64, EngineError>
    where
        F: FnMut(u64, &mut Platform),
    {
        if let Err(e) = self.init(graphics, platform) {
            error!(error = %e, "Initialization failed");
            self.shutdown(graphics, platform)?;
            return Err(e);
        }

        let mut failure = None;
        while self.state == LifecycleState::Running {
            if max_frames.is_some_and(|max| self.frame >= max) {
                self.stop();
                break;
            }

            before_frame(self.frame, platform);
            match self.update(graphics, platform) {
                Ok(_) => platform.advance_frame(),
                Err(e) => {
                    error!(error = %e, "Update failed");
                    failure = Some(e);
                }
            }
        }

        self.shutdown(graphics, platform)?;
        match failure {
            Some(e) => Err(e),
            None => Ok(self.frame),
        }
    }

    fn expect_state(
        &self,
        expected: LifecycleState,
        action: &'static str,
    ) -> Result<(), EngineError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(EngineError::Lifecycle {
                action,
                state: self.state,
            })
        }
    }
}
