//! Engine side of the application
//!
//! Owns the window, main loop and graphics backend, and drives an
//! [`Application`] through `init → update* → shutdown`.

pub mod config;
mod engine;
pub mod input;
mod lifecycle;
mod platform;
mod runner;
mod window;

pub use config::{AppConfig, BackendKind, GraphicsConfig, LogConfig, WindowConfig};
pub use engine::{Engine, EngineError, LifecycleState};
pub use lifecycle::{Application, EngineContext, UpdateStatus};
pub use platform::Platform;
pub use runner::run_windowed;
pub use window::window_attributes_from_config;
