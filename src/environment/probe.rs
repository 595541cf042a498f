//! Host facts gathered once at the start of a run.

use super::network::NetworkProbe;
use super::package_manager::{self, PackageManager};
use crate::shell::{CommandSpec, ProcessRunner};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, warn};

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?").expect("valid version regex"));

/// Operating system family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Linux,
    Macos,
    Other(String),
}

impl OsFamily {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "linux" => Self::Linux,
            "macos" => Self::Macos,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A `major.minor.patch` interpreter version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct RuntimeVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl RuntimeVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Extract the first version number from text such as `Python 3.11.4`.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = VERSION_RE.captures(text)?;
        Some(Self {
            major: caps[1].parse().ok()?,
            minor: caps[2].parse().ok()?,
            patch: caps
                .get(3)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0),
        })
    }

    pub fn at_least(self, major: u32, minor: u32) -> bool {
        (self.major, self.minor) >= (major, minor)
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Immutable description of the host.
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub os_family: OsFamily,
    /// Human-readable distribution name (`NAME=` in os-release).
    pub distribution: String,
    /// Machine-readable distribution id (`ID=` in os-release).
    pub distribution_id: String,
    pub architecture: String,
    pub runtime_version: Option<RuntimeVersion>,
    pub externally_managed: bool,
    pub package_manager: Option<PackageManager>,
    pub network_reachable: bool,
}

impl SystemInfo {
    /// Kali ships a default sources list that frequently fails to refresh.
    pub fn is_kali(&self) -> bool {
        self.distribution_id.eq_ignore_ascii_case("kali")
            || self.distribution.to_lowercase().contains("kali")
    }

    /// Release-asset architecture name (`amd64` / `arm64`), if supported.
    pub fn release_arch(&self) -> Option<&'static str> {
        release_arch(&self.architecture)
    }
}

/// Map `uname -m` style names to release-asset names.
pub fn release_arch(machine: &str) -> Option<&'static str> {
    match machine.to_lowercase().as_str() {
        "x86_64" | "amd64" => Some("amd64"),
        "aarch64" | "arm64" => Some("arm64"),
        _ => None,
    }
}

/// Parse `NAME=` and `ID=` from os-release content.
pub fn parse_os_release(content: &str) -> (String, String) {
    let mut name = None;
    let mut id = None;
    for line in content.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'').to_string();
        match key.trim() {
            "NAME" => name = Some(value),
            "ID" => id = Some(value),
            _ => {}
        }
    }
    (
        name.unwrap_or_else(|| "unknown".to_string()),
        id.unwrap_or_else(|| "unknown".to_string()),
    )
}

/// Look for a PEP 668 `EXTERNALLY-MANAGED` marker under `lib_roots`.
///
/// Each root is scanned for `python*` directories containing the marker.
pub fn has_externally_managed_marker(lib_roots: &[PathBuf]) -> bool {
    lib_roots.iter().any(|root| {
        let Ok(entries) = fs::read_dir(root) else {
            return false;
        };
        entries.flatten().any(|entry| {
            entry.file_name().to_string_lossy().starts_with("python")
                && entry.path().join("EXTERNALLY-MANAGED").is_file()
        })
    })
}

/// Gathers [`SystemInfo`].
pub struct EnvironmentProbe<'a> {
    runner: &'a dyn ProcessRunner,
    network: &'a NetworkProbe,
    search_path: Vec<PathBuf>,
    os_release: PathBuf,
    lib_roots: Vec<PathBuf>,
}

impl<'a> EnvironmentProbe<'a> {
    pub fn new(
        runner: &'a dyn ProcessRunner,
        network: &'a NetworkProbe,
        search_path: Vec<PathBuf>,
    ) -> Self {
        Self {
            runner,
            network,
            search_path,
            os_release: PathBuf::from("/etc/os-release"),
            lib_roots: vec![PathBuf::from("/usr/lib"), PathBuf::from("/usr/local/lib")],
        }
    }

    /// Read distribution facts from another os-release file.
    pub fn with_os_release(mut self, path: impl Into<PathBuf>) -> Self {
        self.os_release = path.into();
        self
    }

    /// Scan other library roots for the PEP 668 marker.
    pub fn with_lib_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.lib_roots = roots;
        self
    }

    /// Probe everything.
    pub fn probe(&self) -> SystemInfo {
        let (distribution, distribution_id) = self.distribution();
        let info = SystemInfo {
            os_family: OsFamily::current(),
            distribution,
            distribution_id,
            architecture: std::env::consts::ARCH.to_string(),
            runtime_version: self.runtime_version(),
            externally_managed: self.externally_managed(),
            package_manager: package_manager::detect(&self.search_path),
            network_reachable: self.network.is_reachable(),
        };
        info!(
            os = ?info.os_family,
            distribution = %info.distribution,
            arch = %info.architecture,
            python = ?info.runtime_version.map(|v| v.to_string()),
            externally_managed = info.externally_managed,
            package_manager = ?info.package_manager,
            network = info.network_reachable,
            "probed host"
        );
        info
    }

    fn distribution(&self) -> (String, String) {
        match fs::read_to_string(&self.os_release) {
            Ok(content) => parse_os_release(&content),
            Err(e) => {
                debug!(path = %self.os_release.display(), error = %e, "no os-release");
                ("unknown".to_string(), "unknown".to_string())
            }
        }
    }

    /// The `python3` version, if python3 runs.
    pub fn runtime_version(&self) -> Option<RuntimeVersion> {
        let spec = CommandSpec::new(["python3", "--version"]).timeout(Duration::from_secs(10));
        let output = self.runner.run(&spec).ok().filter(|o| o.success())?;
        // Python 2 and early 3.x print the version to stderr.
        RuntimeVersion::parse(&output.stdout).or_else(|| RuntimeVersion::parse(&output.stderr))
    }

    /// Whether pip refuses to install into the system interpreter.
    pub fn externally_managed(&self) -> bool {
        if has_externally_managed_marker(&self.lib_roots) {
            return true;
        }
        let spec = CommandSpec::new(["python3", "-m", "pip", "install", "--dry-run", "requests"])
            .timeout(Duration::from_secs(30));
        match self.runner.run(&spec) {
            Ok(output) => output
                .stderr
                .to_lowercase()
                .contains("externally-managed-environment"),
            Err(e) => {
                warn!(error = %e, "could not determine whether python is externally managed");
                false
            }
        }
    }
}
