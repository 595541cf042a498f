//! Mock reporter for testing.
//!
//! `MockReporter` implements the [`Reporter`] trait and captures every
//! call for later assertion.

use std::cell::RefCell;
use std::rc::Rc;

use crate::orchestrator::InstallationReport;

use super::{OutputMode, Reporter, SpinnerHandle};

/// Mock reporter capturing all interactions.
#[derive(Debug, Default)]
pub struct MockReporter {
    mode: OutputMode,
    messages: Vec<String>,
    successes: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
    headers: Vec<String>,
    progress: Vec<(usize, usize, String)>,
    spinners: Vec<String>,
    spinner_results: Rc<RefCell<Vec<SpinnerResult>>>,
    summaries: Vec<InstallationReport>,
}

/// How a mock spinner was finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpinnerResult {
    Success(String),
    Error(String),
    Skipped(String),
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: OutputMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn successes(&self) -> &[String] {
        &self.successes
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn progress_calls(&self) -> &[(usize, usize, String)] {
        &self.progress
    }

    /// Messages of every spinner started.
    pub fn spinners(&self) -> &[String] {
        &self.spinners
    }

    /// Finishing calls of every spinner, in order.
    pub fn spinner_results(&self) -> Vec<SpinnerResult> {
        self.spinner_results.borrow().clone()
    }

    pub fn summaries(&self) -> &[InstallationReport] {
        &self.summaries
    }

    pub fn has_message(&self, msg: &str) -> bool {
        self.messages.iter().any(|m| m.contains(msg))
    }

    pub fn has_success(&self, msg: &str) -> bool {
        self.successes.iter().any(|m| m.contains(msg))
    }

    pub fn has_warning(&self, msg: &str) -> bool {
        self.warnings.iter().any(|m| m.contains(msg))
    }

    pub fn has_error(&self, msg: &str) -> bool {
        self.errors.iter().any(|m| m.contains(msg))
    }
}

impl Reporter for MockReporter {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn message(&mut self, msg: &str) {
        self.messages.push(msg.to_string());
    }

    fn success(&mut self, msg: &str) {
        self.successes.push(msg.to_string());
    }

    fn warning(&mut self, msg: &str) {
        self.warnings.push(msg.to_string());
    }

    fn error(&mut self, msg: &str) {
        self.errors.push(msg.to_string());
    }

    fn header(&mut self, title: &str) {
        self.headers.push(title.to_string());
    }

    fn progress(&mut self, current: usize, total: usize, label: &str) {
        self.progress.push((current, total, label.to_string()));
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        self.spinners.push(message.to_string());
        Box::new(MockSpinner {
            results: Rc::clone(&self.spinner_results),
        })
    }

    fn summary(&mut self, report: &InstallationReport) {
        self.summaries.push(report.clone());
    }
}

/// Spinner handed out by [`MockReporter`].
pub struct MockSpinner {
    results: Rc<RefCell<Vec<SpinnerResult>>>,
}

impl SpinnerHandle for MockSpinner {
    fn set_message(&mut self, _msg: &str) {}

    fn finish_success(&mut self, msg: &str) {
        self.results
            .borrow_mut()
            .push(SpinnerResult::Success(msg.to_string()));
    }

    fn finish_error(&mut self, msg: &str) {
        self.results
            .borrow_mut()
            .push(SpinnerResult::Error(msg.to_string()));
    }

    fn finish_skipped(&mut self, msg: &str) {
        self.results
            .borrow_mut()
            .push(SpinnerResult::Skipped(msg.to_string()));
    }
}
