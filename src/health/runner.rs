//! Test runner for orchestrating health checks

use std::time::Instant;

use tracing::{debug, info, warn};

use super::check::{CheckResult, CheckStatus, SystemCheck};

/// Results from running a health check suite
#[derive(Debug)]
pub struct HealthCheckReport {
    /// Individual check results with their system names
    pub results: Vec<(String, CheckResult)>,
    /// Total number of checks run
    pub total: usize,
    /// Number of passing checks
    pub passed: usize,
    /// Number of checks with warnings
    pub warned: usize,
    /// Number of failing checks
    pub failed: usize,
}

impl HealthCheckReport {
    /// Returns true if all checks passed (no failures)
    pub fn is_healthy(&self) -> bool {
        self.failed == 0
    }

    /// Returns true if there are any warnings
    pub fn has_warnings(&self) -> bool {
        self.warned > 0
    }

    /// Names and messages of the failed checks
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.results
            .iter()
            .filter(|(_, result)| result.status.is_fail())
            .map(|(name, result)| (name.as_str(), result.message.as_str()))
    }

    /// Returns the appropriate exit code for this report
    /// 0 = all pass, 1 = any fail, 2 = any warn (but no fail)
    pub fn exit_code(&self) -> i32 {
        if self.failed > 0 {
            1
        } else if self.warned > 0 {
            2
        } else {
            0
        }
    }
}

/// Orchestrates running health checks and collecting results
pub struct HealthCheckRunner {
    checks: Vec<Box<dyn SystemCheck>>,
}

impl HealthCheckRunner {
    /// Creates a new runner with no checks
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Adds a check to the runner
    pub fn add_check<C: SystemCheck + 'static>(mut self, check: C) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    /// Runs all registered checks and returns a report
    pub fn run(self) -> HealthCheckReport {
        let mut results = Vec::new();
        let mut passed = 0;
        let mut warned = 0;
        let mut failed = 0;

        for check in self.checks {
            let name = check.name().to_string();
            debug!(check = %name, description = check.description(), "Running health check");

            let start = Instant::now();
            let result = check.check().with_duration(start.elapsed());

            match result.status {
                CheckStatus::Pass => passed += 1,
                CheckStatus::Warn => {
                    warn!(check = %name, message = %result.message, "Health check warned");
                    warned += 1;
                }
                CheckStatus::Fail => {
                    warn!(check = %name, message = %result.message, "Health check failed");
                    failed += 1;
                }
            }

            results.push((name, result));
        }

        let total = results.len();
        info!(total, passed, warned, failed, "Health checks complete");

        HealthCheckReport {
            results,
            total,
            passed,
            warned,
            failed,
        }
    }
}

impl Default for HealthCheckRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str, CheckStatus);

    impl SystemCheck for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn check(&self) -> CheckResult {
            match self.1 {
                CheckStatus::Pass => CheckResult::pass("fine"),
                CheckStatus::Warn => CheckResult::warn("meh"),
                CheckStatus::Fail => CheckResult::fail("broken"),
            }
        }
    }

    #[test]
    fn test_counts_and_exit_codes() {
        let runner = HealthCheckRunner::new()
            .add_check(Fixed("a", CheckStatus::Pass))
            .add_check(Fixed("b", CheckStatus::Warn));
        assert_eq!(runner.len(), 2);

        let report = runner.run();
        assert_eq!((report.passed, report.warned, report.failed), (1, 1, 0));
        assert!(report.is_healthy());
        assert_eq!(report.exit_code(), 2);

        let report = HealthCheckRunner::new()
            .add_check(Fixed("a", CheckStatus::Warn))
            .add_check(Fixed("b", CheckStatus::Fail))
            .run();
        assert!(!report.is_healthy());
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.failures().collect::<Vec<_>>(), vec![("b", "broken")]);
    }

    #[test]
    fn test_results_keep_registration_order() {
        let report = HealthCheckRunner::new()
            .add_check(Fixed("first", CheckStatus::Pass))
            .add_check(Fixed("second", CheckStatus::Pass))
            .run();

        let names: Vec<_> = report.results.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["first", "second"]);
        assert_eq!(report.exit_code(), 0);
    }
}
