//! Package repository repair.
//!
//! A bounded state machine that backs up a package source list, rewrites it
//! with known-good content, validates it with an index refresh, tries an
//! alternate configuration when that fails, and restores the backup when
//! both fail.
//!
//! ```text
//! Unchecked -> BackedUp -> Rewritten -> Validated
//!                              |
//!                              v
//!                         RewrittenAlt -> Validated
//!                              |
//!                              v
//!                  FailedRestored | Failed (no backup)
//! ```

use super::files::{copy_privileged, sha256_hex, write_privileged};
use crate::error::{ResolverError, Result};
use crate::shell::{CommandSpec, ProcessRunner};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Known-good Kali source list.
pub const KALI_PRIMARY_SOURCES: &str = "\
# Kali Linux repositories
deb http://http.kali.org/kali kali-rolling main non-free-firmware contrib non-free
deb-src http://http.kali.org/kali kali-rolling main non-free-firmware contrib non-free

# Alternative mirrors in case of issues
# deb http://ftp.halifax.rwth-aachen.de/kali kali-rolling main non-free-firmware contrib non-free
# deb http://mirror.kali.org/kali kali-rolling main non-free-firmware contrib non-free
";

/// Fallback Kali source list using explicit mirrors.
pub const KALI_ALTERNATE_SOURCES: &str = "\
# Alternative Kali Linux repositories
deb http://mirror.kali.org/kali kali-rolling main non-free-firmware contrib non-free
deb http://ftp.halifax.rwth-aachen.de/kali kali-rolling main non-free-firmware contrib non-free
";

/// Timeout for `apt-get update` during validation.
pub const REFRESH_TIMEOUT: Duration = Duration::from_secs(120);

/// Repair progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairState {
    Unchecked,
    BackedUp,
    Rewritten,
    RewrittenAlt,
    Validated,
    FailedRestored,
    Failed,
}

/// A backup taken (or reused) before rewriting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryBackup {
    pub original_path: PathBuf,
    pub backup_path: PathBuf,
    /// sha256 of the backed-up content.
    pub digest: String,
    pub restored: bool,
}

/// Result of [`RepositoryRepair::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairOutcome {
    pub state: RepairState,
    pub backup: Option<RepositoryBackup>,
    /// Every state visited, starting with `Unchecked`.
    pub history: Vec<RepairState>,
}

impl RepairOutcome {
    pub fn is_validated(&self) -> bool {
        self.state == RepairState::Validated
    }
}

/// Repairs one repository file.
pub struct RepositoryRepair<'a> {
    runner: &'a dyn ProcessRunner,
    target: PathBuf,
    backup_path: PathBuf,
    primary: String,
    alternate: String,
    refresh: CommandSpec,
    history: Vec<RepairState>,
}

impl<'a> RepositoryRepair<'a> {
    pub fn new(
        runner: &'a dyn ProcessRunner,
        target: impl Into<PathBuf>,
        backup_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            target: target.into(),
            backup_path: backup_path.into(),
            primary: KALI_PRIMARY_SOURCES.to_string(),
            alternate: KALI_ALTERNATE_SOURCES.to_string(),
            refresh: CommandSpec::new(["apt-get", "update"])
                .sudo()
                .timeout(REFRESH_TIMEOUT),
            history: vec![RepairState::Unchecked],
        }
    }

    /// Use other known-good configurations.
    pub fn with_configs(mut self, primary: impl Into<String>, alternate: impl Into<String>) -> Self {
        self.primary = primary.into();
        self.alternate = alternate.into();
        self
    }

    /// Use another validation command.
    pub fn with_refresh(mut self, refresh: CommandSpec) -> Self {
        self.refresh = refresh;
        self
    }

    fn enter(&mut self, state: RepairState) {
        info!(file = %self.target.display(), ?state, "repository repair");
        self.history.push(state);
    }

    /// Drive the state machine to a terminal state.
    ///
    /// # Errors
    ///
    /// `Interrupted` on Ctrl-C, `ConfigurationCorrupt` when a restored file
    /// does not match its backup digest, and IO errors taking the backup.
    pub fn run(mut self) -> Result<RepairOutcome> {
        let mut backup = self.back_up()?;
        if backup.is_some() {
            self.enter(RepairState::BackedUp);
        }

        let primary = self.primary.clone();
        if self.rewrite_and_validate(&primary, RepairState::Rewritten)? {
            return Ok(self.finish(RepairState::Validated, backup));
        }

        let alternate = self.alternate.clone();
        if self.rewrite_and_validate(&alternate, RepairState::RewrittenAlt)? {
            return Ok(self.finish(RepairState::Validated, backup));
        }

        match backup.as_mut() {
            Some(b) => {
                self.restore(b)?;
                Ok(self.finish(RepairState::FailedRestored, backup))
            }
            None => Ok(self.finish(RepairState::Failed, None)),
        }
    }

    fn finish(mut self, state: RepairState, backup: Option<RepositoryBackup>) -> RepairOutcome {
        self.enter(state);
        RepairOutcome {
            state,
            backup,
            history: self.history,
        }
    }

    /// Copy the target aside unless a backup from an earlier run exists.
    fn back_up(&self) -> Result<Option<RepositoryBackup>> {
        if !self.backup_path.exists() {
            if !self.target.exists() {
                return Ok(None);
            }
            copy_privileged(self.runner, &self.target, &self.backup_path)?;
            info!(backup = %self.backup_path.display(), "backed up repository file");
        }
        let content = fs::read(&self.backup_path)?;
        Ok(Some(RepositoryBackup {
            original_path: self.target.clone(),
            backup_path: self.backup_path.clone(),
            digest: sha256_hex(&content),
            restored: false,
        }))
    }

    fn rewrite_and_validate(&mut self, content: &str, state: RepairState) -> Result<bool> {
        if let Err(e) = write_privileged(self.runner, &self.target, content.as_bytes(), 0o644) {
            if e.is_interrupt() {
                return Err(e);
            }
            warn!(file = %self.target.display(), error = %e, "could not rewrite repository file");
            return Ok(false);
        }
        self.enter(state);

        match self.runner.run_checked(&self.refresh) {
            Ok(_) => Ok(true),
            Err(e) if e.is_interrupt() => Err(e),
            Err(e) => {
                warn!(error = %e, "index refresh failed");
                Ok(false)
            }
        }
    }

    fn restore(&mut self, backup: &mut RepositoryBackup) -> Result<()> {
        let content = fs::read(&backup.backup_path)?;
        write_privileged(self.runner, &self.target, &content, 0o644)?;
        backup.restored = true;
        verify_digest(&self.target, &backup.digest)?;
        warn!(file = %self.target.display(), "restored original repository file");
        Ok(())
    }
}

fn verify_digest(path: &Path, expected: &str) -> Result<()> {
    let actual = sha256_hex(&fs::read(path)?);
    if actual == expected {
        Ok(())
    } else {
        Err(ResolverError::ConfigurationCorrupt {
            path: path.to_path_buf(),
            message: format!("restored content digest {actual} does not match backup {expected}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::{FakeResponse, FakeRunner};
    use tempfile::TempDir;

    const ORIGINAL: &str = "deb http://broken.example/kali kali-rolling main\n";

    struct Fixture {
        _temp: TempDir,
        target: PathBuf,
        backup: PathBuf,
    }

    fn fixture(with_target: bool) -> Fixture {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("sources.list");
        let backup = temp.path().join("sources.list.backup");
        if with_target {
            fs::write(&target, ORIGINAL).unwrap();
        }
        Fixture {
            _temp: temp,
            target,
            backup,
        }
    }

    #[test]
    fn primary_success_validates() {
        let f = fixture(true);
        let runner = FakeRunner::new().succeeds(&["apt-get", "update"]);

        let outcome = RepositoryRepair::new(&runner, &f.target, &f.backup).run().unwrap();

        assert_eq!(outcome.state, RepairState::Validated);
        assert_eq!(
            outcome.history,
            vec![
                RepairState::Unchecked,
                RepairState::BackedUp,
                RepairState::Rewritten,
                RepairState::Validated
            ]
        );
        assert_eq!(fs::read_to_string(&f.target).unwrap(), KALI_PRIMARY_SOURCES);
        assert_eq!(fs::read_to_string(&f.backup).unwrap(), ORIGINAL);
        assert!(runner.calls()[0].requires_sudo);
    }

    #[test]
    fn alternate_used_when_primary_refresh_fails() {
        let f = fixture(true);
        let runner = FakeRunner::new()
            .succeeds(&["apt-get", "update"])
            .once(&["apt-get", "update"], FakeResponse::Exit(100));

        let outcome = RepositoryRepair::new(&runner, &f.target, &f.backup).run().unwrap();

        assert_eq!(outcome.state, RepairState::Validated);
        assert_eq!(
            outcome.history,
            vec![
                RepairState::Unchecked,
                RepairState::BackedUp,
                RepairState::Rewritten,
                RepairState::RewrittenAlt,
                RepairState::Validated
            ]
        );
        assert_eq!(fs::read_to_string(&f.target).unwrap(), KALI_ALTERNATE_SOURCES);
    }

    #[test]
    fn missing_refresh_tool_restores_backup() {
        let f = fixture(true);
        let runner = FakeRunner::new();
        let repair = RepositoryRepair::new(&runner, &f.target, &f.backup)
            .with_refresh(CommandSpec::new(["refresh-index"]));
        let outcome = repair.run().unwrap();
        assert_eq!(outcome.state, RepairState::FailedRestored);
    }

    #[test]
    fn rollback_restores_pre_run_content() {
        let f = fixture(true);
        let runner = FakeRunner::new().fails(&["apt-get", "update"], 100);

        let outcome = RepositoryRepair::new(&runner, &f.target, &f.backup).run().unwrap();

        assert_eq!(outcome.state, RepairState::FailedRestored);
        assert_eq!(fs::read_to_string(&f.target).unwrap(), ORIGINAL);
        let backup = outcome.backup.unwrap();
        assert!(backup.restored);
        assert_eq!(backup.digest, sha256_hex(ORIGINAL.as_bytes()));
        assert_eq!(
            runner.calls().iter().filter(|c| c.program() == "apt-get").count(),
            2
        );
    }

    #[test]
    fn existing_backup_is_reused() {
        let f = fixture(true);
        fs::write(&f.backup, "deb http://from-earlier-run/kali kali-rolling main\n").unwrap();
        let runner = FakeRunner::new().fails(&["apt-get", "update"], 100);

        let outcome = RepositoryRepair::new(&runner, &f.target, &f.backup).run().unwrap();

        assert_eq!(outcome.state, RepairState::FailedRestored);
        assert_eq!(
            fs::read_to_string(&f.target).unwrap(),
            "deb http://from-earlier-run/kali kali-rolling main\n"
        );
    }

    #[test]
    fn missing_target_without_backup_ends_failed_with_alternate() {
        let f = fixture(false);
        let runner = FakeRunner::new().fails(&["apt-get", "update"], 100);

        let outcome = RepositoryRepair::new(&runner, &f.target, &f.backup).run().unwrap();

        assert_eq!(outcome.state, RepairState::Failed);
        assert!(outcome.backup.is_none());
        assert!(!outcome.history.contains(&RepairState::BackedUp));
        assert_eq!(fs::read_to_string(&f.target).unwrap(), KALI_ALTERNATE_SOURCES);
    }

    #[test]
    fn missing_target_skips_to_rewrite() {
        let f = fixture(false);
        let runner = FakeRunner::new().succeeds(&["apt-get", "update"]);

        let outcome = RepositoryRepair::new(&runner, &f.target, &f.backup).run().unwrap();

        assert_eq!(
            outcome.history,
            vec![
                RepairState::Unchecked,
                RepairState::Rewritten,
                RepairState::Validated
            ]
        );
        assert!(!f.backup.exists());
    }

    #[test]
    fn digest_mismatch_is_configuration_corrupt() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("f");
        fs::write(&path, "changed").unwrap();
        let err = verify_digest(&path, &sha256_hex(b"original")).unwrap_err();
        assert!(matches!(err, ResolverError::ConfigurationCorrupt { .. }));
    }

    #[test]
    fn custom_configs_are_written() {
        let f = fixture(true);
        let runner = FakeRunner::new().succeeds(&["apt-get", "update"]);

        RepositoryRepair::new(&runner, &f.target, &f.backup)
            .with_configs("deb primary\n", "deb alternate\n")
            .run()
            .unwrap();

        assert_eq!(fs::read_to_string(&f.target).unwrap(), "deb primary\n");
    }
}
