//! Windowed driver for the engine

use std::sync::Arc;

use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use super::engine::{Engine, EngineError, LifecycleState};
use super::lifecycle::UpdateStatus;
use super::platform::Platform;
use super::window::window_attributes_from_config;
use crate::gfx::{GraphicsBackend, WgpuBackend};

/// Runs the engine in a window until the application finishes or the window closes
pub fn run_windowed(engine: Engine) -> Result<(), EngineError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let (width, height) = engine.config().window.size();
    let mut runner = WindowRunner {
        engine,
        window: None,
        backend: None,
        platform: Platform::new(width, height),
        failure: None,
    };

    event_loop.run_app(&mut runner)?;

    match runner.failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

struct WindowRunner {
    engine: Engine,
    window: Option<Arc<Window>>,
    backend: Option<WgpuBackend>,
    platform: Platform,
    /// First error that ended the loop
    failure: Option<EngineError>,
}

impl WindowRunner {
    fn fail(&mut self, event_loop: &ActiveEventLoop, e: EngineError) {
        error!(error = %e, "Engine failure, exiting");
        if self.failure.is_none() {
            self.failure = Some(e);
        }
        event_loop.exit();
    }

    /// Creates the window and backend, then runs the application's init
    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<(), EngineError> {
        let config = self.engine.config().clone();
        let window = event_loop.create_window(window_attributes_from_config(&config.window))?;
        let size = window.inner_size();
        info!(
            window.width = size.width,
            window.height = size.height,
            "Window created successfully"
        );

        let window = Arc::new(window);

        // winit's event loop is synchronous, so block on backend setup here
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| EngineError::Backend(anyhow::Error::new(e)))?;
        let backend = runtime
            .block_on(WgpuBackend::new(window.clone(), config.window.vsync))
            .map_err(EngineError::Backend)?;

        self.platform.set_window_size(size.width, size.height);
        self.window = Some(window.clone());
        let backend = self.backend.insert(backend);

        self.engine.init(backend, &self.platform)?;
        window.request_redraw();
        Ok(())
    }

    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        if self.engine.state() != LifecycleState::Running {
            return;
        }
        let Some(backend) = self.backend.as_mut() else {
            return;
        };

        match self.engine.update(backend, &self.platform) {
            Ok(UpdateStatus::InProgress) => {
                self.platform.advance_frame();
            }
            Ok(UpdateStatus::Done) => {
                info!("Application finished, exiting");
                event_loop.exit();
            }
            Err(e) => self.fail(event_loop, e),
        }
    }
}

impl ApplicationHandler for WindowRunner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none()
            && self.engine.state() == LifecycleState::Created
            && let Err(e) = self.start(event_loop)
        {
            self.fail(event_loop, e);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        self.platform.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, exiting");
                self.engine.stop();
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(backend) = &mut self.backend {
                    backend.resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::RedrawRequested => self.frame(event_loop),
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        let result = match self.backend.as_mut() {
            Some(backend) => self.engine.shutdown(backend, &self.platform),
            None => {
                self.engine.abandon();
                Ok(())
            }
        };

        if let Err(e) = result {
            error!(error = %e, "Shutdown failed");
            self.failure.get_or_insert(e);
        }
    }
}
