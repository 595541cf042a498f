//! Terminal reporter.

use console::Term;
use std::io::Write;
use std::time::Duration;

use crate::orchestrator::{InstallationReport, ToolReport, ToolStatus};
use crate::shell::is_ci;

use super::{format_duration, OutputMode, ProgressSpinner, ReconTheme, Reporter, SpinnerHandle};

/// Reporter drawing to stdout.
pub struct TerminalReporter {
    term: Term,
    theme: ReconTheme,
    mode: OutputMode,
}

impl TerminalReporter {
    /// Colors follow `NO_COLOR` and whether stdout is a terminal.
    pub fn new(mode: OutputMode) -> Self {
        Self::with_theme(mode, ReconTheme::detect())
    }

    pub fn with_theme(mode: OutputMode, theme: ReconTheme) -> Self {
        Self {
            term: Term::stdout(),
            theme,
            mode,
        }
    }

    fn tool_line(&self, tool: &ToolReport) -> String {
        let text = format!("{:<14} {}", tool.name, tool.status.label());
        match tool.status {
            ToolStatus::Skipped => self.theme.format_skipped(&text),
            status if status.is_available() => self.theme.format_success(&text),
            _ => self.theme.format_error(&text),
        }
    }
}

impl Reporter for TerminalReporter {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn message(&mut self, msg: &str) {
        if self.mode.shows_status() {
            writeln!(self.term, "  {}", msg).ok();
        }
    }

    fn success(&mut self, msg: &str) {
        if self.mode.shows_status() {
            writeln!(self.term, "  {}", self.theme.format_success(msg)).ok();
        }
    }

    fn warning(&mut self, msg: &str) {
        writeln!(self.term, "  {}", self.theme.format_warning(msg)).ok();
    }

    fn error(&mut self, msg: &str) {
        writeln!(self.term, "  {}", self.theme.format_error(msg)).ok();
    }

    fn header(&mut self, title: &str) {
        if self.mode.shows_status() {
            writeln!(self.term, "\n{}", self.theme.format_header(title)).ok();
        }
    }

    fn progress(&mut self, current: usize, total: usize, label: &str) {
        if self.mode.shows_status() {
            writeln!(
                self.term,
                "\n{} {}",
                self.theme.dim.apply_to(format!("[{}/{}]", current, total)),
                self.theme.highlight.apply_to(label)
            )
            .ok();
        }
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        if self.mode.shows_spinners() && self.term.is_term() && !is_ci() {
            Box::new(ProgressSpinner::new(message, self.theme.clone()))
        } else {
            Box::new(ProgressSpinner::hidden())
        }
    }

    fn summary(&mut self, report: &InstallationReport) {
        let b = &self.theme.border;

        writeln!(self.term).ok();
        writeln!(
            self.term,
            "  {} {}",
            b.apply_to("┌─"),
            b.apply_to("Summary ──────────────────────────")
        )
        .ok();

        for step in &report.steps {
            let line = if step.succeeded {
                self.theme.format_success(&step.step_name)
            } else {
                self.theme.format_error(&step.step_name)
            };
            writeln!(
                self.term,
                "  {} {:<38} {}",
                b.apply_to("│"),
                line,
                self.theme.dim.apply_to(&step.detail)
            )
            .ok();
        }

        if self.mode.shows_status() && !report.tools.is_empty() {
            writeln!(
                self.term,
                "  {}",
                b.apply_to("├─ Tools ──────────────────────────")
            )
            .ok();
            for tool in &report.tools {
                let line = self.tool_line(tool);
                writeln!(self.term, "  {} {}", b.apply_to("│"), line).ok();
                if self.mode.shows_attempts() {
                    for attempt in &tool.attempts {
                        let outcome = match attempt.error_kind {
                            Some(kind) if !attempt.succeeded => kind.label(),
                            _ => "ok",
                        };
                        writeln!(
                            self.term,
                            "  {}     {}",
                            b.apply_to("│"),
                            self.theme.dim.apply_to(format!(
                                "{} ({}, {})",
                                attempt.method,
                                outcome,
                                format_duration(Duration::from_millis(attempt.duration_ms))
                            ))
                        )
                        .ok();
                    }
                }
            }
        }

        writeln!(
            self.term,
            "  {}",
            b.apply_to("├────────────────────────────────────")
        )
        .ok();
        writeln!(
            self.term,
            "  {} {}/{} steps {} {:.0}% {} threshold {:.0}%",
            b.apply_to("│"),
            report.success_count,
            report.total_steps,
            self.theme.dim.apply_to("·"),
            report.success_ratio * 100.0,
            self.theme.dim.apply_to("·"),
            report.threshold * 100.0,
        )
        .ok();
        writeln!(
            self.term,
            "  {}",
            b.apply_to("└────────────────────────────────────")
        )
        .ok();

        let verdict = format!(
            "{}/{} steps succeeded",
            report.success_count, report.total_steps
        );
        if report.is_success() {
            writeln!(self.term, "\n  {}", self.theme.format_success(&verdict)).ok();
        } else {
            writeln!(
                self.term,
                "\n  {}",
                self.theme.format_warning(&format!("Partial installation: {}", verdict))
            )
            .ok();
        }
    }
}
