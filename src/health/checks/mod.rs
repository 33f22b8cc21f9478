//! Built-in health checks for core systems

pub mod build_info;
pub mod config;
pub mod graphics_backend;
pub mod triangle;

pub use build_info::BuildInfoCheck;
pub use config::ConfigCheck;
pub use graphics_backend::GraphicsBackendCheck;
pub use triangle::TriangleSceneCheck;
