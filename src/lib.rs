//! Simple Triangle
//!
//! An immediate-mode command-buffer renderer on wgpu and winit, and the
//! triangle application that draws through it.

/// Engine - windowing, main loop, lifecycle and configuration
pub mod app;

/// Build-time information (git SHA, branch, timestamp, etc.)
pub mod build_info;

/// Graphics contract - handles, command buffers and backends
pub mod gfx;

/// Startup health checks
pub mod health;

/// The triangle application
pub mod triangle;
