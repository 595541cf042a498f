//! Platform queries and PATH handling.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Check if running in a CI environment.
///
/// Used to suppress spinners in the terminal reporter. Checks common CI
/// environment variables: `CI`, `GITHUB_ACTIONS`, `GITLAB_CI`, `CIRCLECI`,
/// `TRAVIS`, `JENKINS_URL`.
pub fn is_ci() -> bool {
    std::env::var("CI").is_ok()
        || std::env::var("GITHUB_ACTIONS").is_ok()
        || std::env::var("GITLAB_CI").is_ok()
        || std::env::var("CIRCLECI").is_ok()
        || std::env::var("TRAVIS").is_ok()
        || std::env::var("JENKINS_URL").is_ok()
}

/// Check if running as root.
pub fn is_elevated() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: geteuid() is a simple syscall that returns the effective user ID
        unsafe { libc::geteuid() == 0 }
    }

    #[cfg(not(unix))]
    {
        false
    }
}

/// The current user's home directory, falling back to `/root`.
pub fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("/root"))
}

/// Expand a leading `~/` against the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home_dir().join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// Check whether a file has executable permission bits set.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(_path: &Path) -> bool {
    true
}

/// Parse the system PATH environment variable into a list of directories.
pub fn parse_system_path() -> Vec<PathBuf> {
    std::env::var_os("PATH")
        .map(|path| std::env::split_paths(&path).collect())
        .unwrap_or_default()
}

/// Prepend `extra` entries to `system`, skipping duplicates.
pub fn augment_path(extra: &[PathBuf], system: &[PathBuf]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::with_capacity(extra.len() + system.len());
    for dir in extra.iter().chain(system.iter()) {
        if !result.contains(dir) {
            result.push(dir.clone());
        }
    }
    result
}

/// Join PATH entries into a value suitable for the `PATH` variable.
pub fn join_path(entries: &[PathBuf]) -> OsString {
    std::env::join_paths(entries).unwrap_or_else(|_| {
        // An entry contained the separator; fall back to the inherited PATH.
        std::env::var_os("PATH").unwrap_or_default()
    })
}

/// Resolve a program by iterating over PATH entries.
///
/// Names containing a slash are checked directly. Returns the first match
/// that exists and is executable.
pub fn find_program(program: &str, path_entries: &[PathBuf]) -> Option<PathBuf> {
    if program.is_empty() {
        return None;
    }
    if program.contains('/') {
        let candidate = PathBuf::from(program);
        return (candidate.is_file() && is_executable(&candidate)).then_some(candidate);
    }
    path_entries
        .iter()
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file() && is_executable(candidate))
}
