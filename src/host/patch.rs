//! Best-effort fixes to installed third-party sources.
//!
//! A [`SourcePatch`] names a file relative to a Python `site-packages`
//! directory, a regex that must match exactly once, and its replacement.
//! Files where the fix is already present are left alone.

use super::files::write_privileged;
use crate::error::Result;
use crate::resolver::{InstallContext, NativeStep};
use crate::shell::platform::home_dir;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{info, warn};

static MTA_STS_TIMEOUT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<pre>[(,]\s*)\btimeout=timeout\b").expect("valid mta_sts regex")
});

/// What [`SourcePatch::apply_to`] found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    Applied(PathBuf),
    AlreadyApplied(PathBuf),
    /// The signature matched zero or several times; nothing was written.
    SignatureMismatch { path: PathBuf, matches: usize },
    NotFound,
}

/// A regex rewrite of one installed source file.
#[derive(Debug, Clone)]
pub struct SourcePatch {
    pub name: String,
    /// Path below `site-packages`, e.g. `checkdmarc/mta_sts.py`.
    pub relative_path: PathBuf,
    pub pattern: Regex,
    pub replacement: String,
    /// Text whose presence means the fix is already in place.
    pub applied_marker: String,
}

impl SourcePatch {
    pub fn new(
        name: impl Into<String>,
        relative_path: impl Into<PathBuf>,
        pattern: Regex,
        replacement: impl Into<String>,
        applied_marker: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            relative_path: relative_path.into(),
            pattern,
            replacement: replacement.into(),
            applied_marker: applied_marker.into(),
        }
    }

    /// checkdmarc passes `timeout=` to a helper that expects
    /// `http_timeout=` when fetching MTA-STS policies.
    pub fn checkdmarc_mta_sts() -> Self {
        Self::new(
            "checkdmarc mta_sts timeout fix",
            "checkdmarc/mta_sts.py",
            MTA_STS_TIMEOUT_RE.clone(),
            "${pre}http_timeout=timeout",
            "http_timeout=timeout",
        )
    }

    /// Candidate files below each of `site_dirs`, in order.
    pub fn locate(&self, site_dirs: &[PathBuf]) -> Vec<PathBuf> {
        site_dirs
            .iter()
            .map(|dir| dir.join(&self.relative_path))
            .filter(|path| path.is_file())
            .collect()
    }

    /// Patch one file in place.
    pub fn apply_to(
        &self,
        path: &Path,
        write: impl Fn(&Path, &str) -> Result<()>,
    ) -> Result<PatchOutcome> {
        let content = fs::read_to_string(path)?;
        let matches = self.pattern.find_iter(&content).count();

        if matches == 0 && content.contains(&self.applied_marker) {
            return Ok(PatchOutcome::AlreadyApplied(path.to_path_buf()));
        }
        if matches != 1 {
            return Ok(PatchOutcome::SignatureMismatch {
                path: path.to_path_buf(),
                matches,
            });
        }

        let patched = self.pattern.replace(&content, self.replacement.as_str());
        write(path, &patched)?;
        Ok(PatchOutcome::Applied(path.to_path_buf()))
    }

    /// Patch every located copy. Returns one outcome per file, or
    /// `[NotFound]` when none exist.
    pub fn apply(
        &self,
        site_dirs: &[PathBuf],
        write: impl Fn(&Path, &str) -> Result<()>,
    ) -> Result<Vec<PatchOutcome>> {
        let files = self.locate(site_dirs);
        if files.is_empty() {
            return Ok(vec![PatchOutcome::NotFound]);
        }
        files.iter().map(|path| self.apply_to(path, &write)).collect()
    }

    /// Wrap as a post-install hook. The hook never fails the install:
    /// problems are logged and swallowed.
    pub fn into_hook(self) -> NativeStep {
        let name = self.name.clone();
        NativeStep::new(name, move |ctx: &InstallContext<'_>| {
            let mut dirs = Vec::new();
            if let Ok(entries) = fs::read_dir(&ctx.config.paths.venv_root) {
                for entry in entries.flatten() {
                    dirs.extend(site_packages_dirs(&entry.path()));
                }
            }
            dirs.extend(site_packages_dirs(&home_dir().join(".local")));

            let write = |path: &Path, content: &str| {
                write_privileged(ctx.runner, path, content.as_bytes(), 0o644)
            };
            match self.apply(&dirs, write) {
                Ok(outcomes) => {
                    for outcome in outcomes {
                        log_outcome(&self.name, &outcome);
                    }
                }
                Err(e) if e.is_interrupt() => return Err(e),
                Err(e) => warn!(patch = %self.name, error = %e, "patch not applied"),
            }
            Ok(())
        })
    }
}

fn log_outcome(name: &str, outcome: &PatchOutcome) {
    match outcome {
        PatchOutcome::Applied(path) => info!(patch = name, file = %path.display(), "patch applied"),
        PatchOutcome::AlreadyApplied(path) => {
            info!(patch = name, file = %path.display(), "patch already applied")
        }
        PatchOutcome::SignatureMismatch { path, matches } => warn!(
            patch = name,
            file = %path.display(),
            matches,
            "patch signature did not match exactly once, skipped"
        ),
        PatchOutcome::NotFound => warn!(patch = name, "patched file not found, skipped"),
    }
}

/// `<prefix>/lib/python*/site-packages` directories that exist.
pub fn site_packages_dirs(prefix: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(prefix.join("lib")) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().starts_with("python"))
        .map(|e| e.path().join("site-packages"))
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    dirs
}
