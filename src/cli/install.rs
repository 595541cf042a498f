//! The install command: probe the host, run the pipeline, report.

use std::path::PathBuf;

use tracing::info;

use crate::catalog::Catalog;
use crate::config::InstallerConfig;
use crate::environment::{EnvironmentProbe, NetworkProbe, SystemInfo};
use crate::error::Result;
use crate::orchestrator::InstallationOrchestrator;
use crate::resolver::InstallContext;
use crate::shell::{InterruptFlag, ProcessRunner, SystemRunner};
use crate::ui::Reporter;

/// Exit code for a Ctrl-C'd run.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Result of command execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandResult {
    /// Whether the run met its success threshold.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }

    pub fn interrupted() -> Self {
        Self::failure(EXIT_INTERRUPTED)
    }
}

/// One installer run.
pub struct InstallCommand {
    config: InstallerConfig,
    report_json: Option<PathBuf>,
}

impl InstallCommand {
    pub fn new(config: InstallerConfig, report_json: Option<PathBuf>) -> Self {
        Self {
            config,
            report_json,
        }
    }

    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    /// Run against the local host, honouring Ctrl-C.
    pub fn execute(&self, reporter: &mut dyn Reporter) -> Result<CommandResult> {
        let interrupt = InterruptFlag::process();
        let runner = SystemRunner::new(&self.config.extra_path, interrupt.clone());
        let search_path = runner.search_path().to_vec();
        self.execute_with(&runner, &search_path, &interrupt, reporter)
    }

    /// Run with a caller-supplied runner and PATH.
    pub fn execute_with(
        &self,
        runner: &dyn ProcessRunner,
        search_path: &[PathBuf],
        interrupt: &InterruptFlag,
        reporter: &mut dyn Reporter,
    ) -> Result<CommandResult> {
        let config = &self.config;
        let network = NetworkProbe::new(
            config.network.tcp_targets.clone(),
            config.network.http_targets.clone(),
            config.timeouts.network_probe(),
        );
        let system = EnvironmentProbe::new(runner, &network, search_path.to_vec()).probe();
        reporter.message(&describe_host(&system));

        let ctx = InstallContext {
            runner,
            system: &system,
            config,
            search_path,
            interrupt,
            network_available: system.network_reachable,
        };
        let catalog = Catalog::builtin(&system, config);

        let report = match InstallationOrchestrator::new(&ctx, &catalog, reporter).run() {
            Ok(report) => report,
            Err(e) if e.is_interrupt() => {
                info!("installation interrupted");
                reporter.warning("Installation interrupted");
                return Ok(CommandResult::interrupted());
            }
            Err(e) => return Err(e),
        };

        if let Some(path) = &self.report_json {
            report.write_json(path)?;
            info!(path = %path.display(), "report written");
            reporter.message(&format!("Report written to {}", path.display()));
        }

        Ok(if report.is_success() {
            CommandResult::success()
        } else {
            CommandResult::failure(1)
        })
    }
}

fn describe_host(system: &SystemInfo) -> String {
    let python = system
        .runtime_version
        .map(|v| v.to_string())
        .unwrap_or_else(|| "none".to_string());
    let manager = system
        .package_manager
        .map(|m| m.to_string())
        .unwrap_or_else(|| "none".to_string());
    format!(
        "Host: {} ({}), python3 {}, package manager {}",
        system.distribution, system.architecture, python, manager
    )
}
