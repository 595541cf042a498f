//! Idempotent edits to shell startup files.
//!
//! Lines are only ever appended, and only when the exact text is not
//! already present somewhere in the file. Existing content is never
//! rewritten or reordered, so running the installer twice leaves the same
//! profile as running it once.

use crate::error::{ResolverError, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What [`ensure_lines`] did to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileChange {
    pub path: PathBuf,
    /// Lines appended by this call, in order.
    pub added: Vec<String>,
    /// The file did not exist before.
    pub created: bool,
}

impl ProfileChange {
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && !self.created
    }
}

/// Append every line of `lines` not already contained in `path`.
pub fn ensure_lines<S: AsRef<str>>(path: &Path, lines: &[S]) -> Result<ProfileChange> {
    let created = !path.exists();
    let content = if created {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        String::new()
    } else {
        fs::read_to_string(path)?
    };

    let mut added: Vec<String> = Vec::new();
    for line in lines {
        let line = line.as_ref();
        if line.is_empty() || content.contains(line) || added.iter().any(|a| a == line) {
            continue;
        }
        added.push(line.to_string());
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if !added.is_empty() {
        let block: String = added.iter().map(|line| format!("\n{line}\n")).collect();
        file.write_all(block.as_bytes())?;
        info!(profile = %path.display(), lines = added.len(), "updated shell profile");
    }

    Ok(ProfileChange {
        path: path.to_path_buf(),
        added,
        created,
    })
}

/// The only component allowed to open shell profiles.
#[derive(Debug, Clone)]
pub struct ProfileMutator {
    candidates: Vec<PathBuf>,
}

impl ProfileMutator {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    /// First existing candidate, or the first candidate created empty.
    pub fn select_profile(&self) -> Result<PathBuf> {
        if let Some(existing) = self.candidates.iter().find(|p| p.exists()) {
            return Ok(existing.clone());
        }
        let first = self
            .candidates
            .first()
            .ok_or_else(|| ResolverError::ConfigValidationError {
                message: "no shell profile candidates configured".to_string(),
            })?;
        if let Some(parent) = first.parent() {
            fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(first)?;
        Ok(first.clone())
    }

    /// Ensure `lines` in the selected profile.
    pub fn ensure_lines<S: AsRef<str>>(&self, lines: &[S]) -> Result<ProfileChange> {
        let profile = self.select_profile()?;
        ensure_lines(&profile, lines)
    }

    /// Ensure `lines` in every existing candidate. A file that can't be
    /// updated is logged and skipped.
    pub fn ensure_lines_in_existing<S: AsRef<str>>(&self, lines: &[S]) -> Vec<ProfileChange> {
        self.candidates
            .iter()
            .filter(|p| p.exists())
            .filter_map(|p| match ensure_lines(p, lines) {
                Ok(change) => Some(change),
                Err(e) => {
                    warn!(profile = %p.display(), error = %e, "could not update profile");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LINES: [&str; 2] = [
        r#"export PATH="/usr/local/bin:$PATH""#,
        r#"export PATH="$HOME/go/bin:$PATH""#,
    ];

    #[test]
    fn appends_missing_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".bashrc");
        fs::write(&path, "alias ll='ls -l'").unwrap();

        let change = ensure_lines(&path, &LINES).unwrap();

        assert_eq!(change.added.len(), 2);
        assert!(!change.created);
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("alias ll='ls -l'\n"));
        assert!(content.contains(LINES[0]));
        assert!(content.contains(LINES[1]));
    }

    #[test]
    fn lines_are_appended_without_extra_markup() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".bashrc");
        fs::write(&path, "alias ll='ls -l'\n").unwrap();

        ensure_lines(&path, &LINES).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            format!("alias ll='ls -l'\n\n{}\n\n{}\n", LINES[0], LINES[1])
        );
    }

    #[test]
    fn ensure_twice_equals_once() {
        let starts = ["", "export PATH=\"/usr/local/bin:$PATH\"\n", "no newline at end"];
        for start in starts {
            let temp = TempDir::new().unwrap();
            let path = temp.path().join(".zshrc");
            fs::write(&path, start).unwrap();

            ensure_lines(&path, &LINES).unwrap();
            let once = fs::read_to_string(&path).unwrap();
            let second = ensure_lines(&path, &LINES).unwrap();
            let twice = fs::read_to_string(&path).unwrap();

            assert_eq!(once, twice, "starting content: {start:?}");
            assert!(second.is_unchanged());
        }
    }

    #[test]
    fn present_line_is_not_duplicated() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".profile");
        fs::write(&path, format!("{}\n", LINES[0])).unwrap();

        let change = ensure_lines(&path, &LINES).unwrap();

        assert_eq!(change.added, vec![LINES[1].to_string()]);
        assert_eq!(fs::read_to_string(&path).unwrap().matches(LINES[0]).count(), 1);
    }

    #[test]
    fn duplicate_input_lines_are_written_once() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".bashrc");
        let change = ensure_lines(&path, &[LINES[0], LINES[0]]).unwrap();
        assert_eq!(change.added.len(), 1);
        assert!(change.created);
    }

    #[test]
    fn existing_content_is_preserved_verbatim() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".bashrc");
        let original = "line one\nline two\n";
        fs::write(&path, original).unwrap();

        ensure_lines(&path, &LINES).unwrap();

        assert!(fs::read_to_string(&path).unwrap().starts_with(original));
    }

    #[test]
    fn select_profile_prefers_first_existing() {
        let temp = TempDir::new().unwrap();
        let bashrc = temp.path().join(".bashrc");
        let zshrc = temp.path().join(".zshrc");
        fs::write(&zshrc, "").unwrap();

        let mutator = ProfileMutator::new(vec![bashrc.clone(), zshrc.clone()]);
        assert_eq!(mutator.select_profile().unwrap(), zshrc);
        assert!(!bashrc.exists());
    }

    #[test]
    fn select_profile_creates_first_when_none_exist() {
        let temp = TempDir::new().unwrap();
        let bashrc = temp.path().join(".bashrc");
        let mutator = ProfileMutator::new(vec![bashrc.clone(), temp.path().join(".zshrc")]);

        assert_eq!(mutator.select_profile().unwrap(), bashrc);
        assert!(bashrc.exists());
    }

    #[test]
    fn select_profile_without_candidates_errors() {
        assert!(ProfileMutator::new(vec![]).select_profile().is_err());
    }

    #[test]
    fn ensure_in_existing_skips_missing_files() {
        let temp = TempDir::new().unwrap();
        let bashrc = temp.path().join(".bashrc");
        let profile = temp.path().join(".profile");
        let zshrc = temp.path().join(".zshrc");
        fs::write(&bashrc, "").unwrap();
        fs::write(&profile, "").unwrap();

        let mutator = ProfileMutator::new(vec![bashrc, zshrc.clone(), profile]);
        let changes = mutator.ensure_lines_in_existing(&[r#"export PATH="/snap/bin:$PATH""#]);

        assert_eq!(changes.len(), 2);
        assert!(!zshrc.exists());
    }
}
