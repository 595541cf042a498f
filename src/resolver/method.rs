//! Installation methods and the context they run in.

use crate::config::InstallerConfig;
use crate::environment::SystemInfo;
use crate::error::Result;
use crate::shell::{find_program, CommandOutput, CommandSpec, InterruptFlag, ProcessRunner};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

/// Which list a method came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Primary,
    Alternative,
}

/// Everything an installation method may touch.
pub struct InstallContext<'a> {
    pub runner: &'a dyn ProcessRunner,
    pub system: &'a SystemInfo,
    pub config: &'a InstallerConfig,
    /// PATH used for program lookups (configured extras first).
    pub search_path: &'a [PathBuf],
    pub interrupt: &'a InterruptFlag,
    /// Result of the network probe; methods needing the network are
    /// skipped when false.
    pub network_available: bool,
}

impl InstallContext<'_> {
    /// Run a command, failing on non-zero exit.
    pub fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.runner.run_checked(spec)
    }

    /// Run a command and report whether it exited 0.
    ///
    /// Errors other than Ctrl-C count as failure.
    pub fn succeeds(&self, spec: &CommandSpec) -> Result<bool> {
        match self.runner.run(spec) {
            Ok(output) => Ok(output.success()),
            Err(e) if e.is_interrupt() => Err(e),
            Err(_) => Ok(false),
        }
    }

    /// Whether `program` resolves on the search path.
    pub fn has_program(&self, program: &str) -> bool {
        find_program(program, self.search_path).is_some()
    }
}

/// Procedure behind a [`NativeStep`].
pub type NativeAction = Rc<dyn Fn(&InstallContext<'_>) -> Result<()>>;

/// A named in-process procedure: multi-command installs, file edits,
/// post-install fixes.
#[derive(Clone)]
pub struct NativeStep {
    pub name: String,
    pub requires_network: bool,
    pub action: NativeAction,
}

impl NativeStep {
    pub fn new<F>(name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&InstallContext<'_>) -> Result<()> + 'static,
    {
        Self {
            name: name.into(),
            requires_network: false,
            action: Rc::new(action),
        }
    }

    pub fn needs_network(mut self) -> Self {
        self.requires_network = true;
        self
    }

    pub fn run(&self, ctx: &InstallContext<'_>) -> Result<()> {
        (self.action)(ctx)
    }
}

impl fmt::Debug for NativeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeStep")
            .field("name", &self.name)
            .field("requires_network", &self.requires_network)
            .finish_non_exhaustive()
    }
}

/// A single external command used as an install method.
#[derive(Debug, Clone)]
pub struct ShellCommand {
    pub label: String,
    pub command: CommandSpec,
    pub requires_network: bool,
}

/// One way of installing a tool.
#[derive(Debug, Clone)]
pub enum InstallationMethod {
    ShellCommand(ShellCommand),
    NativeStep(NativeStep),
}

impl InstallationMethod {
    /// A shell command labelled with its command line.
    pub fn command(command: CommandSpec) -> Self {
        Self::ShellCommand(ShellCommand {
            label: command.display(),
            command,
            requires_network: false,
        })
    }

    pub fn native<F>(name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&InstallContext<'_>) -> Result<()> + 'static,
    {
        Self::NativeStep(NativeStep::new(name, action))
    }

    /// Replace the display label.
    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        match &mut self {
            Self::ShellCommand(cmd) => cmd.label = label.into(),
            Self::NativeStep(step) => step.name = label.into(),
        }
        self
    }

    pub fn needs_network(mut self) -> Self {
        match &mut self {
            Self::ShellCommand(cmd) => cmd.requires_network = true,
            Self::NativeStep(step) => step.requires_network = true,
        }
        self
    }

    pub fn label(&self) -> &str {
        match self {
            Self::ShellCommand(cmd) => &cmd.label,
            Self::NativeStep(step) => &step.name,
        }
    }

    pub fn requires_network(&self) -> bool {
        match self {
            Self::ShellCommand(cmd) => cmd.requires_network,
            Self::NativeStep(step) => step.requires_network,
        }
    }

    /// Execute the method. The return value says nothing about whether the
    /// tool is now installed; only verification decides that.
    pub fn execute(&self, ctx: &InstallContext<'_>) -> Result<()> {
        match self {
            Self::ShellCommand(cmd) => ctx.run(&cmd.command).map(|_| ()),
            Self::NativeStep(step) => step.run(ctx),
        }
    }
}

impl From<NativeStep> for InstallationMethod {
    fn from(step: NativeStep) -> Self {
        Self::NativeStep(step)
    }
}
