//! File writes that may need elevation.
//!
//! Writes are staged in a temporary file and moved into place, so a target
//! never holds a partial write. When the direct rename is refused the staged
//! file is installed with `sudo install`.

use crate::error::{ResolverError, Result};
use crate::shell::{CommandSpec, ProcessRunner};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::debug;

const SUDO_TIMEOUT: Duration = Duration::from_secs(60);

/// Hex-encoded sha256 of `content`.
pub fn sha256_hex(content: &[u8]) -> String {
    let hash = Sha256::digest(content);
    hex::encode(&hash[..])
}

/// Replace `path` with `content` and set its permission bits to `mode`.
pub fn write_privileged(
    runner: &dyn ProcessRunner,
    path: &Path,
    content: &[u8],
    mode: u32,
) -> Result<()> {
    match write_atomic(path, content, mode) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            debug!(path = %path.display(), "direct write refused, using sudo install");
            install_with_sudo(runner, path, content, mode)
        }
        Err(e) => Err(e.into()),
    }
}

/// Copy `from` to `to`, with sudo when the destination is not writable.
pub fn copy_privileged(runner: &dyn ProcessRunner, from: &Path, to: &Path) -> Result<()> {
    match fs::copy(from, to) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            let spec = CommandSpec::new([
                "cp".to_string(),
                "-p".to_string(),
                from.display().to_string(),
                to.display().to_string(),
            ])
            .sudo()
            .timeout(SUDO_TIMEOUT);
            runner.run_checked(&spec).map(|_| ())
        }
        Err(e) => Err(e.into()),
    }
}

fn write_atomic(path: &Path, content: &[u8], mode: u32) -> std::io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(content)?;
    staged.flush()?;
    set_mode(staged.path(), mode)?;
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn install_with_sudo(
    runner: &dyn ProcessRunner,
    path: &Path,
    content: &[u8],
    mode: u32,
) -> Result<()> {
    let mut staged = NamedTempFile::new()?;
    staged.write_all(content)?;
    staged.flush()?;
    let spec = CommandSpec::new([
        "install".to_string(),
        "-m".to_string(),
        format!("{mode:o}"),
        staged.path().display().to_string(),
        path.display().to_string(),
    ])
    .sudo()
    .timeout(SUDO_TIMEOUT);
    runner.run_checked(&spec).map_err(|e| match e {
        ResolverError::CommandFailed { .. } => ResolverError::PermissionDenied {
            message: format!("could not write {}", path.display()),
        },
        other => other,
    })?;
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}
