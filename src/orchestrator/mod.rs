//! Fixed pipeline of named install steps with ratio-gated success.
//!
//! Each step reports a [`StepResult`]. A step's error is caught at the
//! step boundary and recorded as a failure; only
//! [`ResolverError::Interrupted`](crate::error::ResolverError::Interrupted)
//! ends the run early. The run succeeds when the share of successful
//! steps reaches the configured run threshold.

pub mod report;
pub mod steps;

pub use report::{
    ratio_met, success_ratio, tally, InstallationReport, StepResult, ToolReport, ToolStatus,
};
pub use steps::Step;

use crate::catalog::Catalog;
use crate::error::Result;
use crate::resolver::{InstallContext, StrategyChain, Tool, VerificationGate};
use crate::shell::platform::parse_system_path;
use crate::ui::Reporter;
use std::path::PathBuf;
use tracing::{error, info};

/// Drives the pipeline for one run.
pub struct InstallationOrchestrator<'a> {
    ctx: &'a InstallContext<'a>,
    gate: VerificationGate<'a>,
    catalog: &'a Catalog,
    reporter: &'a mut dyn Reporter,
    steps: Vec<Step>,
    tools: Vec<ToolReport>,
    /// PATH the user's shell hands to new processes, without the
    /// installer's own additions.
    inherited_path: Vec<PathBuf>,
}

impl<'a> InstallationOrchestrator<'a> {
    /// The default six-step pipeline over `catalog`.
    pub fn new(
        ctx: &'a InstallContext<'a>,
        catalog: &'a Catalog,
        reporter: &'a mut dyn Reporter,
    ) -> Self {
        let gate = VerificationGate::new(ctx.runner, ctx.search_path)
            .with_timeout(ctx.config.timeouts.verify());
        Self {
            ctx,
            gate,
            catalog,
            reporter,
            steps: Step::ALL.to_vec(),
            tools: Vec::new(),
            inherited_path: parse_system_path(),
        }
    }

    /// Run only `steps`, in the given order.
    pub fn with_steps(mut self, steps: Vec<Step>) -> Self {
        self.steps = steps;
        self
    }

    /// Check the environment against `path` instead of the inherited PATH.
    pub fn with_inherited_path(mut self, path: Vec<PathBuf>) -> Self {
        self.inherited_path = path;
        self
    }

    /// Run every step and build the report.
    ///
    /// # Errors
    ///
    /// Only `Interrupted`; every other failure is part of the report.
    pub fn run(mut self) -> Result<InstallationReport> {
        let steps = std::mem::take(&mut self.steps);
        let total = steps.len();
        let mut results = Vec::with_capacity(total);

        for (index, step) in steps.into_iter().enumerate() {
            self.ctx.interrupt.check()?;
            self.reporter.progress(index + 1, total, step.name());

            let result = match self.run_step(step) {
                Ok(result) => result,
                Err(e) if e.is_interrupt() => return Err(e),
                Err(e) => {
                    error!(step = step.name(), error = %e, "step failed with error");
                    StepResult::new(step.name(), false, e.to_string())
                }
            };

            info!(
                step = %result.step_name,
                succeeded = result.succeeded,
                detail = %result.detail,
                "step finished"
            );
            if result.succeeded {
                self.reporter.success(&format!("{} completed", result.step_name));
            } else {
                self.reporter.error(&format!("{} failed", result.step_name));
            }
            results.push(result);
        }

        let report = InstallationReport::new(
            results,
            std::mem::take(&mut self.tools),
            self.ctx.config.thresholds.run,
        );
        info!(
            success_count = report.success_count,
            total_steps = report.total_steps,
            ratio = report.success_ratio,
            success = report.is_success(),
            "installation finished"
        );
        self.reporter.summary(&report);
        Ok(report)
    }

    fn run_step(&mut self, step: Step) -> Result<StepResult> {
        self.reporter.header(step.name());
        match step {
            Step::Prerequisites => self.prerequisites(),
            Step::ReportDependencies => self.report_dependencies(),
            Step::SecurityTools => self.security_tools(),
            Step::PythonTools => self.python_tools(),
            Step::EnvironmentSetup => self.environment_setup(),
            Step::Verification => self.verification(),
        }
    }

    /// Resolve one tool, record it in the report and show the outcome.
    fn resolve_tool(&mut self, tool: &Tool) -> Result<ToolStatus> {
        if self.ctx.config.is_skipped(&tool.name) {
            info!(tool = %tool.name, "skipped by configuration");
            self.reporter
                .start_spinner(&tool.name)
                .finish_skipped(&format!("{} skipped", tool.name));
            self.tools.push(ToolReport::skipped(tool));
            return Ok(ToolStatus::Skipped);
        }

        let mut spinner = self
            .reporter
            .start_spinner(&format!("Resolving {} ({})", tool.name, tool.description));
        let resolution = {
            let chain = StrategyChain::new(self.ctx, &self.gate);
            chain.resolve(tool)
        };
        let resolution = match resolution {
            Ok(resolution) => resolution,
            Err(e) => {
                spinner.finish_error(&format!("{} interrupted", tool.name));
                return Err(e);
            }
        };

        let report = ToolReport::from_resolution(tool, resolution);
        let status = report.status;
        if status.is_available() {
            spinner.finish_success(&format!("{} {}", tool.name, status.label()));
        } else {
            let reason = report.last_error().unwrap_or("no install method succeeded");
            spinner.finish_error(&format!("{} unresolved: {}", tool.name, reason));
        }
        self.tools.push(report);
        Ok(status)
    }

    /// Resolve a catalog tool by name. Unknown names count as unresolved.
    fn resolve_named(&mut self, name: &str) -> Result<ToolStatus> {
        let catalog = self.catalog;
        match catalog.get(name) {
            Some(tool) => self.resolve_tool(tool),
            None => Ok(ToolStatus::Unresolved),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolverError;
    use crate::resolver::Category;
    use crate::shell::FakeRunner;
    use crate::test_support::TestHost;
    use crate::ui::{MockReporter, SpinnerResult};

    fn security_catalog() -> Catalog {
        Catalog::from_tools(
            ["amass", "httpx", "nmap", "testssl.sh"]
                .into_iter()
                .map(|name| Tool::new(name, "scanner", Category::Security))
                .collect(),
        )
    }

    #[test]
    fn three_of_four_security_tools_pass_the_step() {
        let runner = FakeRunner::new()
            .installed("amass")
            .installed("httpx")
            .installed("nmap");
        let host = TestHost::new(runner);
        let ctx = host.ctx();
        let catalog = security_catalog();
        let mut reporter = MockReporter::new();

        let report = InstallationOrchestrator::new(&ctx, &catalog, &mut reporter)
            .with_steps(vec![Step::SecurityTools])
            .run()
            .unwrap();

        assert!(report.steps[0].succeeded);
        assert_eq!(report.steps[0].detail, "3/4 tools available");
        assert_eq!(report.tool("testssl.sh").unwrap().status, ToolStatus::Unresolved);
        assert_eq!(report.tool("nmap").unwrap().status, ToolStatus::AlreadyInstalled);
        assert_eq!(reporter.summaries().len(), 1);
    }

    #[test]
    fn skipped_tools_are_not_attempted_or_counted() {
        let runner = FakeRunner::new()
            .installed("httpx")
            .installed("nmap")
            .installed("testssl.sh");
        let mut host = TestHost::new(runner);
        host.config.skip_tools = vec!["amass".to_string()];
        let ctx = host.ctx();
        let catalog = security_catalog();
        let mut reporter = MockReporter::new();

        let report = InstallationOrchestrator::new(&ctx, &catalog, &mut reporter)
            .with_steps(vec![Step::SecurityTools])
            .run()
            .unwrap();

        assert!(report.steps[0].succeeded);
        assert_eq!(report.tool("amass").unwrap().status, ToolStatus::Skipped);
        assert!(!host.runner.was_called(&["amass"]));
        assert!(reporter
            .spinner_results()
            .contains(&SpinnerResult::Skipped("amass skipped".into())));
    }

    #[test]
    fn interrupt_ends_the_run() {
        let host = TestHost::new(FakeRunner::new());
        host.interrupt.raise();
        let ctx = host.ctx();
        let catalog = security_catalog();
        let mut reporter = MockReporter::new();

        let err = InstallationOrchestrator::new(&ctx, &catalog, &mut reporter)
            .run()
            .unwrap_err();

        assert!(matches!(err, ResolverError::Interrupted));
        assert!(reporter.summaries().is_empty());
    }

    #[test]
    fn step_error_becomes_failed_result() {
        let mut host = TestHost::new(FakeRunner::new());
        host.config.profiles.clear();
        let ctx = host.ctx();
        let catalog = Catalog::from_tools(vec![]);
        let mut reporter = MockReporter::new();

        let report = InstallationOrchestrator::new(&ctx, &catalog, &mut reporter)
            .with_steps(vec![Step::EnvironmentSetup, Step::PythonTools])
            .run()
            .unwrap();

        assert!(!report.steps[0].succeeded);
        assert!(report.steps[0].detail.contains("no shell profile"));
        assert!(report.steps[1].succeeded);
        assert!(reporter.has_error("Environment Setup failed"));
    }

    #[test]
    fn run_fails_below_threshold() {
        let host = TestHost::new(FakeRunner::new());
        let ctx = host.ctx();
        let catalog = security_catalog();
        let mut reporter = MockReporter::new();

        let report = InstallationOrchestrator::new(&ctx, &catalog, &mut reporter)
            .with_steps(vec![Step::SecurityTools, Step::PythonTools])
            .run()
            .unwrap();

        assert_eq!(report.success_count, 1);
        assert!(!report.is_success());
        assert_eq!(reporter.progress_calls().len(), 2);
    }
}
