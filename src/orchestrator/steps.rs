//! The pipeline steps.

use super::report::{ratio_met, StepResult, ToolStatus};
use super::InstallationOrchestrator;
use crate::catalog::{dev_tools_sufficient, DEV_TOOLS};
use crate::error::Result;
use crate::host::{ProfileMutator, RepositoryRepair};
use crate::resolver::Category;
use crate::shell::CommandSpec;
use tracing::{info, warn};

/// A named pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Prerequisites,
    ReportDependencies,
    SecurityTools,
    PythonTools,
    EnvironmentSetup,
    Verification,
}

impl Step {
    /// The default pipeline, in run order.
    pub const ALL: [Step; 6] = [
        Step::Prerequisites,
        Step::ReportDependencies,
        Step::SecurityTools,
        Step::PythonTools,
        Step::EnvironmentSetup,
        Step::Verification,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Prerequisites => "Prerequisites Check",
            Self::ReportDependencies => "Report Dependencies",
            Self::SecurityTools => "Security Tools",
            Self::PythonTools => "Python Tools",
            Self::EnvironmentSetup => "Environment Setup",
            Self::Verification => "Installation Verification",
        }
    }
}

/// Outcome of one sub-check; `None` when every tool it covers is skipped.
type Check = Option<bool>;

fn counted(status: ToolStatus) -> Check {
    match status {
        ToolStatus::Skipped => None,
        status => Some(status.is_available()),
    }
}

/// Passed and considered counts over sub-checks.
fn count(checks: &[Check]) -> (usize, usize) {
    let considered = checks.iter().flatten().count();
    let passed = checks.iter().flatten().filter(|c| **c).count();
    (passed, considered)
}

impl InstallationOrchestrator<'_> {
    pub(super) fn prerequisites(&mut self) -> Result<StepResult> {
        let python = counted(self.resolve_named("python3")?);

        let network = self.ctx.network_available;
        if network {
            self.reporter.success("Internet connectivity available");
        } else {
            self.reporter
                .warning("Limited internet connectivity, network installs will be skipped");
        }

        let manager = self.ctx.system.package_manager;
        match manager {
            Some(manager) => self
                .reporter
                .success(&format!("Package manager available: {manager}")),
            None => self.reporter.warning("No compatible package manager found"),
        }

        let dev_tools = self.development_tools()?;
        let pip = counted(self.resolve_named("pip")?);
        let venv = self.venv_strategy()?;

        let checks = [
            python,
            Some(network),
            Some(manager.is_some()),
            dev_tools,
            pip,
            venv,
        ];
        let (passed, considered) = count(&checks);
        let threshold = self.ctx.config.thresholds.run;
        Ok(StepResult::new(
            Step::Prerequisites.name(),
            ratio_met(passed, considered, threshold),
            format!("{passed}/{considered} checks passed"),
        ))
    }

    /// Kali repository repair, then curl, wget, git and a C toolchain.
    fn development_tools(&mut self) -> Result<Check> {
        if self.ctx.system.is_kali() {
            self.repair_repositories()?;
        }

        let mut resolved = Vec::new();
        let mut considered = 0;
        for name in DEV_TOOLS {
            match counted(self.resolve_named(name)?) {
                Some(true) => {
                    resolved.push(name);
                    considered += 1;
                }
                Some(false) => considered += 1,
                None => {}
            }
        }
        if considered == 0 {
            return Ok(None);
        }

        let sufficient = dev_tools_sufficient(&resolved);
        if !sufficient {
            self.reporter
                .warning("Development tools incomplete, need a downloader and one more tool");
        }
        Ok(Some(sufficient))
    }

    fn repair_repositories(&mut self) -> Result<()> {
        if !self.ctx.network_available {
            self.reporter
                .warning("Skipping repository repair, the network is unreachable");
            return Ok(());
        }

        self.reporter.message("Fixing Kali Linux repository configuration");
        let config = self.ctx.config;
        let refresh = CommandSpec::new(["apt-get", "update"])
            .sudo()
            .timeout(config.timeouts.refresh());
        let outcome = RepositoryRepair::new(
            self.ctx.runner,
            config.paths.repository_file.clone(),
            config.paths.repository_backup.clone(),
        )
        .with_refresh(refresh)
        .run();

        match outcome {
            Ok(outcome) if outcome.is_validated() => {
                self.reporter.success("Package repositories validated");
            }
            Ok(outcome) => {
                warn!(state = ?outcome.state, "repository repair did not validate");
                self.reporter.warning(&format!(
                    "Repository repair ended in {:?}, previous configuration kept",
                    outcome.state
                ));
            }
            Err(e) if e.is_interrupt() => return Err(e),
            Err(e) => self.reporter.error(&format!("Repository repair failed: {e}")),
        }
        Ok(())
    }

    /// Direct installs are fine unless the interpreter is externally
    /// managed; then a virtualenv builder must be available.
    fn venv_strategy(&mut self) -> Result<Check> {
        if !self.ctx.system.externally_managed {
            self.reporter
                .success("Python environment allows direct installations");
            return Ok(Some(true));
        }
        self.reporter.warning(
            "Python environment is externally managed, using dedicated virtual environments",
        );
        Ok(counted(self.resolve_named("virtualenv")?))
    }

    pub(super) fn report_dependencies(&mut self) -> Result<StepResult> {
        let (resolved, considered) = self.resolve_category(Category::ReportDependency)?;
        Ok(StepResult::new(
            Step::ReportDependencies.name(),
            resolved == considered,
            format!("{resolved}/{considered} packages importable"),
        ))
    }

    pub(super) fn security_tools(&mut self) -> Result<StepResult> {
        self.category_step(Step::SecurityTools, Category::Security)
    }

    pub(super) fn python_tools(&mut self) -> Result<StepResult> {
        self.category_step(Step::PythonTools, Category::Python)
    }

    fn category_step(&mut self, step: Step, category: Category) -> Result<StepResult> {
        let (resolved, considered) = self.resolve_category(category)?;
        let threshold = self.ctx.config.thresholds.category;
        Ok(StepResult::new(
            step.name(),
            ratio_met(resolved, considered, threshold),
            format!("{resolved}/{considered} tools available"),
        ))
    }

    /// Resolved and considered counts over a catalog category.
    fn resolve_category(&mut self, category: Category) -> Result<(usize, usize)> {
        let catalog = self.catalog;
        let (mut resolved, mut considered) = (0, 0);
        for tool in catalog.category(category) {
            match counted(self.resolve_tool(tool)?) {
                Some(true) => {
                    resolved += 1;
                    considered += 1;
                }
                Some(false) => considered += 1,
                None => {}
            }
        }
        Ok((resolved, considered))
    }

    pub(super) fn environment_setup(&mut self) -> Result<StepResult> {
        let config = self.ctx.config;
        let change = ProfileMutator::new(config.profiles.clone()).ensure_lines(&config.path_lines)?;

        for line in &change.added {
            self.reporter.message(&format!("Added: {line}"));
        }
        let profile = change.path.display().to_string();
        if change.is_unchanged() {
            self.reporter.success("Environment already configured");
        } else {
            info!(profile = %profile, added = change.added.len(), "profile updated");
            self.reporter.success(&format!("Environment variables added to {profile}"));
            self.reporter
                .warning(&format!("Restart your terminal or run: source {profile}"));
        }

        Ok(StepResult::new(
            Step::EnvironmentSetup.name(),
            true,
            format!("{} line(s) added to {profile}", change.added.len()),
        ))
    }

    pub(super) fn verification(&mut self) -> Result<StepResult> {
        let checks = [
            self.verify_report_dependencies(),
            self.verify_on_path(Category::Security),
            self.verify_on_path(Category::Python),
            self.verify_environment(),
        ];
        let (passed, considered) = count(&checks);
        Ok(StepResult::new(
            Step::Verification.name(),
            passed == considered,
            format!("{passed}/{considered} checks passed"),
        ))
    }

    fn verify_report_dependencies(&mut self) -> Check {
        let catalog = self.catalog;
        let tools: Vec<_> = catalog
            .category(Category::ReportDependency)
            .into_iter()
            .filter(|t| !self.ctx.config.is_skipped(&t.name))
            .collect();
        if tools.is_empty() {
            return None;
        }

        let missing: Vec<_> = tools
            .iter()
            .filter(|t| !self.gate.is_installed(t))
            .map(|t| t.name.as_str())
            .collect();
        if missing.is_empty() {
            self.reporter.success("Report dependencies importable");
            Some(true)
        } else {
            self.reporter
                .error(&format!("Report dependencies missing: {}", missing.join(", ")));
            Some(false)
        }
    }

    /// The share of a category's tools found on PATH must reach the
    /// category threshold.
    fn verify_on_path(&mut self, category: Category) -> Check {
        let catalog = self.catalog;
        let names: Vec<_> = catalog
            .category(category)
            .into_iter()
            .map(|t| t.name.as_str())
            .filter(|name| !self.ctx.config.is_skipped(name))
            .collect();
        if names.is_empty() {
            return None;
        }

        let mut found = 0;
        for name in &names {
            match self.gate.on_path(name) {
                Some(path) => {
                    found += 1;
                    self.reporter
                        .message(&format!("{name} found at {}", path.display()));
                }
                None => self.reporter.warning(&format!("{name} not found on PATH")),
            }
        }
        let passed = ratio_met(found, names.len(), self.ctx.config.thresholds.category);
        let summary = format!("{category}s on PATH: {found}/{}", names.len());
        if passed {
            self.reporter.success(&summary);
        } else {
            self.reporter.error(&summary);
        }
        Some(passed)
    }

    /// The user's own PATH includes the system bin directory, and python3
    /// plus a pip exist.
    fn verify_environment(&mut self) -> Check {
        let system_bin = &self.ctx.config.paths.system_bin;
        let checks = [
            self.inherited_path.contains(system_bin),
            self.gate.on_path("python3").is_some(),
            self.gate.on_path("pip").is_some() || self.gate.on_path("pip3").is_some(),
        ];
        let passed = checks.iter().all(|c| *c);
        if passed {
            self.reporter.success("Environment configuration verified");
        } else {
            self.reporter.error(&format!(
                "Environment incomplete (system bin on PATH: {}, python3: {}, pip: {})",
                checks[0], checks[1], checks[2]
            ));
        }
        Some(passed)
    }
}
