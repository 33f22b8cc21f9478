//! Health check system for validating application startup
//!
//! Each check exercises one system outside the main loop, which makes it
//! usable from CI and from `triangle --health` on a machine that misbehaves.
//!
//! # Example
//!
//! ```no_run
//! use simple_triangle::health::{HealthCheckRunner, checks::*};
//!
//! let report = HealthCheckRunner::new()
//!     .add_check(ConfigCheck::new())
//!     .add_check(TriangleSceneCheck::new())
//!     .run();
//!
//! if report.is_healthy() {
//!     println!("All systems operational!");
//! }
//! ```

pub mod check;
pub mod checks;
pub mod reporter;
pub mod runner;

pub use check::{CheckResult, CheckStatus, SystemCheck};
pub use reporter::{format_details, format_report, print_report};
pub use runner::{HealthCheckReport, HealthCheckRunner};

/// Runs all default health checks and returns a report
pub fn run_all_checks() -> HealthCheckReport {
    HealthCheckRunner::new()
        .add_check(checks::ConfigCheck::new())
        .add_check(checks::BuildInfoCheck::new())
        .add_check(checks::GraphicsBackendCheck::new())
        .add_check(checks::TriangleSceneCheck::new())
        .run()
}
