//! Run results and the final installation report.

use crate::error::Result;
use crate::resolver::{AttemptOutcome, Category, Resolution, ResolvedVia, Tool};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Whether `success` out of `total` reaches `threshold`.
///
/// An empty set meets any threshold.
pub fn ratio_met(success: usize, total: usize, threshold: f64) -> bool {
    total == 0 || success_ratio(success, total) + f64::EPSILON >= threshold
}

/// `success / total`, or 1.0 when `total` is zero.
pub fn success_ratio(success: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        success as f64 / total as f64
    }
}

/// Outcome of one pipeline step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    pub step_name: String,
    pub succeeded: bool,
    pub detail: String,
}

impl StepResult {
    pub fn new(step_name: impl Into<String>, succeeded: bool, detail: impl Into<String>) -> Self {
        Self {
            step_name: step_name.into(),
            succeeded,
            detail: detail.into(),
        }
    }
}

/// Final state of a tool in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    AlreadyInstalled,
    PrimaryMethod,
    AlternativeMethod,
    Unresolved,
    Skipped,
}

impl ToolStatus {
    pub fn is_available(self) -> bool {
        matches!(
            self,
            Self::AlreadyInstalled | Self::PrimaryMethod | Self::AlternativeMethod
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::AlreadyInstalled => "already installed",
            Self::PrimaryMethod => "installed",
            Self::AlternativeMethod => "installed via alternative",
            Self::Unresolved => "unresolved",
            Self::Skipped => "skipped",
        }
    }
}

/// Per-tool entry of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolReport {
    pub name: String,
    pub category: Category,
    pub status: ToolStatus,
    pub attempts: Vec<AttemptOutcome>,
}

impl ToolReport {
    pub fn from_resolution(tool: &Tool, resolution: Resolution) -> Self {
        let status = match &resolution {
            Resolution::Resolved { via, .. } => match via {
                ResolvedVia::AlreadyInstalled => ToolStatus::AlreadyInstalled,
                ResolvedVia::Primary => ToolStatus::PrimaryMethod,
                ResolvedVia::Alternative => ToolStatus::AlternativeMethod,
            },
            Resolution::Unresolved { .. } => ToolStatus::Unresolved,
        };
        Self {
            name: tool.name.clone(),
            category: tool.category,
            status,
            attempts: resolution.into_attempts(),
        }
    }

    pub fn skipped(tool: &Tool) -> Self {
        Self {
            name: tool.name.clone(),
            category: tool.category,
            status: ToolStatus::Skipped,
            attempts: Vec::new(),
        }
    }

    /// Last failure message, for the summary line.
    pub fn last_error(&self) -> Option<&str> {
        self.attempts
            .iter()
            .rev()
            .find(|a| !a.succeeded)
            .map(|a| a.message.as_str())
    }
}

/// Resolved and considered counts for a set of tool reports.
///
/// Skipped tools are left out of both counts.
pub fn tally(reports: &[&ToolReport]) -> (usize, usize) {
    let considered: Vec<_> = reports
        .iter()
        .filter(|r| r.status != ToolStatus::Skipped)
        .collect();
    let resolved = considered.iter().filter(|r| r.status.is_available()).count();
    (resolved, considered.len())
}

/// Everything printed (and optionally written as JSON) at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstallationReport {
    pub steps: Vec<StepResult>,
    pub tools: Vec<ToolReport>,
    pub success_count: usize,
    pub total_steps: usize,
    pub success_ratio: f64,
    pub threshold: f64,
    pub generated_at: DateTime<Utc>,
}

impl InstallationReport {
    pub fn new(steps: Vec<StepResult>, tools: Vec<ToolReport>, threshold: f64) -> Self {
        let success_count = steps.iter().filter(|s| s.succeeded).count();
        let total_steps = steps.len();
        Self {
            success_ratio: success_ratio(success_count, total_steps),
            steps,
            tools,
            success_count,
            total_steps,
            threshold,
            generated_at: Utc::now(),
        }
    }

    /// Whether the run as a whole succeeded.
    pub fn is_success(&self) -> bool {
        ratio_met(self.success_count, self.total_steps, self.threshold)
    }

    pub fn tool(&self, name: &str) -> Option<&ToolReport> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self).context("serializing report")?)
    }

    /// Write the report as pretty JSON, creating parent directories.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::resolver::Tier;
    use tempfile::TempDir;

    fn steps(passed: usize, total: usize) -> Vec<StepResult> {
        (0..total)
            .map(|i| StepResult::new(format!("step {i}"), i < passed, ""))
            .collect()
    }

    fn failed_attempt(message: &str) -> AttemptOutcome {
        AttemptOutcome {
            method: "apt install nmap".into(),
            tier: Tier::Primary,
            succeeded: false,
            error_kind: Some(ErrorKind::CommandFailed),
            message: message.into(),
            duration_ms: 3,
        }
    }

    fn nmap() -> Tool {
        Tool::new("nmap", "Network Mapper", Category::Security)
    }

    #[test]
    fn four_of_five_meets_run_threshold() {
        assert!(ratio_met(4, 5, 0.8));
        assert!(InstallationReport::new(steps(4, 5), vec![], 0.8).is_success());
    }

    #[test]
    fn three_of_five_misses_run_threshold() {
        assert!(!ratio_met(3, 5, 0.8));
        let report = InstallationReport::new(steps(3, 5), vec![], 0.8);
        assert!(!report.is_success());
        assert_eq!(report.success_count, 3);
        assert!((report.success_ratio - 0.6).abs() < 1e-9);
    }

    #[test]
    fn category_threshold_boundaries() {
        assert!(ratio_met(3, 4, 0.75));
        assert!(!ratio_met(2, 4, 0.75));
        assert!(!ratio_met(1, 2, 0.75));
        assert!(ratio_met(0, 0, 0.75));
    }

    #[test]
    fn status_follows_resolution() {
        let resolved = Resolution::Resolved {
            via: ResolvedVia::Alternative,
            attempts: vec![failed_attempt("exit 100")],
        };
        let report = ToolReport::from_resolution(&nmap(), resolved);
        assert_eq!(report.status, ToolStatus::AlternativeMethod);
        assert_eq!(report.attempts.len(), 1);
        assert_eq!(report.last_error(), Some("exit 100"));

        let unresolved = ToolReport::from_resolution(&nmap(), Resolution::Unresolved { attempts: vec![] });
        assert!(!unresolved.status.is_available());
    }

    #[test]
    fn tally_ignores_skipped_tools() {
        let tool = nmap();
        let ok = ToolReport::from_resolution(
            &tool,
            Resolution::Resolved {
                via: ResolvedVia::AlreadyInstalled,
                attempts: vec![],
            },
        );
        let failed = ToolReport::from_resolution(&tool, Resolution::Unresolved { attempts: vec![] });
        let skipped = ToolReport::skipped(&tool);

        assert_eq!(tally(&[&ok, &failed, &skipped]), (1, 2));
        assert_eq!(tally(&[&skipped]), (0, 0));
    }

    #[test]
    fn json_report_uses_snake_case_statuses() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out/report.json");
        let report = InstallationReport::new(
            steps(1, 1),
            vec![ToolReport::skipped(&nmap())],
            0.8,
        );

        report.write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["tools"][0]["status"], "skipped");
        assert_eq!(value["tools"][0]["category"], "security");
        assert_eq!(value["total_steps"], 1);
        assert!(value["generated_at"].is_string());
    }
}
