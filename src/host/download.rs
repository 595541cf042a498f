//! File downloads.
//!
//! Tries `curl`, then `wget`, then an in-process HTTP client, so a host
//! missing both tools can still fetch installers.

use crate::error::{ResolverError, Result};
use crate::shell::{find_program, CommandSpec, ProcessRunner};
use anyhow::{anyhow, Context};
use reqwest::blocking::Client;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Default download timeout.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Downloads URLs to files.
pub struct Downloader<'a> {
    runner: &'a dyn ProcessRunner,
    search_path: &'a [PathBuf],
    timeout: Duration,
}

impl<'a> Downloader<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, search_path: &'a [PathBuf]) -> Self {
        Self {
            runner,
            search_path,
            timeout: DOWNLOAD_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch `url` into `dest`.
    ///
    /// # Errors
    ///
    /// `Interrupted` on Ctrl-C; otherwise the error from the last tool tried.
    pub fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let dest_arg = dest.display().to_string();
        let tools = [
            ("curl", CommandSpec::new(["curl", "-fsSL", "-o", dest_arg.as_str(), url])),
            ("wget", CommandSpec::new(["wget", "-q", "-O", dest_arg.as_str(), url])),
        ];

        for (program, spec) in tools {
            if find_program(program, self.search_path).is_none() {
                continue;
            }
            match self.runner.run_checked(&spec.timeout(self.timeout)) {
                Ok(_) if dest.is_file() => return Ok(()),
                Ok(_) => warn!(tool = program, url, "download reported success but file missing"),
                Err(e) if e.is_interrupt() => return Err(e),
                Err(e) => warn!(tool = program, url, error = %e, "download failed"),
            }
        }

        debug!(url, "falling back to built-in HTTP client");
        fetch_http(url, dest, self.timeout)
    }
}

/// Fetch `url` into `dest` with `reqwest`.
pub fn fetch_http(url: &str, dest: &Path, timeout: Duration) -> Result<()> {
    let client = Client::builder()
        .user_agent(concat!("reconkit/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .context("building HTTP client")?;

    let response = client.get(url).send().map_err(|e| {
        if e.is_connect() || e.is_timeout() {
            ResolverError::NetworkUnavailable {
                message: format!("{url}: {e}"),
            }
        } else {
            ResolverError::Other(e.into())
        }
    })?;

    if !response.status().is_success() {
        return Err(anyhow!("HTTP {} fetching {url}", response.status()).into());
    }
    let body = response.bytes().with_context(|| format!("reading {url}"))?;
    fs::write(dest, &body)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::FakeRunner;
    use tempfile::TempDir;

    #[test]
    fn default_timeout() {
        let runner = FakeRunner::new();
        let downloader = Downloader::new(&runner, &[]);
        assert_eq!(downloader.timeout, DOWNLOAD_TIMEOUT);
    }

    #[cfg(unix)]
    #[test]
    fn curl_is_preferred_when_present() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let bin = temp.path().join("bin");
        fs::create_dir(&bin).unwrap();
        let curl = bin.join("curl");
        fs::write(&curl, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&curl, fs::Permissions::from_mode(0o755)).unwrap();
        let dest = temp.path().join("get-pip.py");
        fs::write(&dest, "print('hi')\n").unwrap();

        let runner = FakeRunner::new().succeeds(&["curl"]);
        let search = vec![bin];
        Downloader::new(&runner, &search)
            .fetch("https://bootstrap.pypa.io/get-pip.py", &dest)
            .unwrap();

        assert!(runner.was_called(&["curl", "-fsSL", "-o"]));
        assert!(!runner.was_called(&["wget"]));
    }

    #[test]
    fn unreachable_host_is_network_unavailable() {
        let temp = TempDir::new().unwrap();
        let err = fetch_http(
            "http://127.0.0.1:9/nothing",
            &temp.path().join("out"),
            Duration::from_secs(2),
        )
        .unwrap_err();
        assert!(matches!(err, ResolverError::NetworkUnavailable { .. }));
    }
}
