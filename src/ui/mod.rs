//! User-facing progress output.
//!
//! This module provides:
//! - [`Reporter`] trait, passed explicitly to the orchestrator for one run
//! - [`TerminalReporter`] for terminal usage (console styles, indicatif spinners)
//! - [`MockReporter`] capturing everything for tests
//!
//! Structured events go through `tracing`; the reporter only draws what a
//! person watching the install needs to see.
//!
//! # Example
//!
//! ```
//! use reconkit::ui::{MockReporter, OutputMode, Reporter};
//!
//! let mut reporter = MockReporter::with_mode(OutputMode::Quiet);
//! reporter.header("Security Tools");
//! reporter.success("nmap");
//! assert!(reporter.has_success("nmap"));
//! ```

pub mod mock;
pub mod output;
pub mod spinner;
pub mod terminal;
pub mod theme;

pub use mock::{MockReporter, MockSpinner, SpinnerResult};
pub use output::{format_duration, OutputMode};
pub use spinner::ProgressSpinner;
pub use terminal::TerminalReporter;
pub use theme::{should_use_colors, ReconTheme};

use crate::orchestrator::InstallationReport;

/// Sink for run progress.
///
/// This trait allows mocking the output in tests.
pub trait Reporter {
    fn output_mode(&self) -> OutputMode;

    fn message(&mut self, msg: &str);

    fn success(&mut self, msg: &str);

    fn warning(&mut self, msg: &str);

    fn error(&mut self, msg: &str);

    /// Section banner for a pipeline step.
    fn header(&mut self, title: &str);

    /// Position within the pipeline (e.g. "Step 3 of 6").
    fn progress(&mut self, current: usize, total: usize, label: &str);

    /// Start a spinner for an operation.
    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle>;

    /// Per-step and per-tool outcomes and the overall ratio.
    fn summary(&mut self, report: &InstallationReport);
}

/// Handle for controlling a spinner.
pub trait SpinnerHandle {
    fn set_message(&mut self, msg: &str);

    fn finish_success(&mut self, msg: &str);

    fn finish_error(&mut self, msg: &str);

    fn finish_skipped(&mut self, msg: &str);
}
