//! Ground truth for "installed".

use super::tool::Tool;
use crate::shell::{find_program, CommandSpec, ProcessRunner};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Default timeout for check invocations.
pub const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs check invocations and PATH lookups. Never mutates the host.
pub struct VerificationGate<'a> {
    runner: &'a dyn ProcessRunner,
    search_path: &'a [PathBuf],
    timeout: Duration,
}

impl<'a> VerificationGate<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, search_path: &'a [PathBuf]) -> Self {
        Self {
            runner,
            search_path,
            timeout: VERIFY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// True iff the tool's check invocation exits 0.
    pub fn is_installed(&self, tool: &Tool) -> bool {
        self.check(&tool.check_invocation)
    }

    /// True iff `argv` runs and exits 0 within the timeout.
    pub fn check(&self, argv: &[String]) -> bool {
        let spec = CommandSpec::new(argv.iter().cloned()).timeout(self.timeout);
        let passed = matches!(self.runner.run(&spec), Ok(output) if output.success());
        debug!(check = %spec.display(), passed, "verification");
        passed
    }

    /// `which`-style lookup over the augmented PATH.
    pub fn on_path(&self, program: &str) -> Option<PathBuf> {
        find_program(program, self.search_path)
    }
}
