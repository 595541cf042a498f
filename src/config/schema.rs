//! Installer configuration schema.
//!
//! Every field has a default, so an empty or missing file yields the
//! stock installer behaviour.

use crate::environment::network::{DEFAULT_HTTP_TARGETS, DEFAULT_TCP_TARGETS};
use crate::shell::platform::{expand_home, home_dir};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration (`~/.reconkit/config.yml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstallerConfig {
    pub thresholds: Thresholds,
    pub timeouts: Timeouts,
    pub network: NetworkConfig,
    pub paths: PathsConfig,
    /// Candidate shell profiles, in preference order.
    pub profiles: Vec<PathBuf>,
    /// Lines the environment step ensures in the selected profile.
    pub path_lines: Vec<String>,
    /// Directories prepended to PATH for every child process and lookup.
    pub extra_path: Vec<PathBuf>,
    /// Tools never attempted.
    pub skip_tools: Vec<String>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        let home = home_dir();
        Self {
            thresholds: Thresholds::default(),
            timeouts: Timeouts::default(),
            network: NetworkConfig::default(),
            paths: PathsConfig::default(),
            profiles: vec![
                home.join(".bashrc"),
                home.join(".zshrc"),
                home.join(".profile"),
            ],
            path_lines: vec![
                r#"export PATH="/usr/local/bin:$PATH""#.to_string(),
                r#"export PATH="$HOME/.local/bin:$PATH""#.to_string(),
                r#"export PATH="$HOME/go/bin:$PATH""#.to_string(),
                r#"export PATH="/snap/bin:$PATH""#.to_string(),
            ],
            extra_path: vec![
                PathBuf::from("/usr/local/bin"),
                home.join(".local/bin"),
                home.join("go/bin"),
                PathBuf::from("/snap/bin"),
            ],
            skip_tools: Vec::new(),
        }
    }
}

impl InstallerConfig {
    /// Expand `~/` in every path field.
    pub fn expand_paths(&mut self) {
        let p = &mut self.paths;
        for path in [
            &mut p.log_file,
            &mut p.system_bin,
            &mut p.local_bin,
            &mut p.go_bin,
            &mut p.snap_bin,
            &mut p.venv_root,
            &mut p.report_venv,
            &mut p.testssl_system_dir,
            &mut p.testssl_home_dir,
            &mut p.repository_file,
            &mut p.repository_backup,
        ] {
            *path = expand_home(path);
        }
        for path in self.profiles.iter_mut().chain(self.extra_path.iter_mut()) {
            *path = expand_home(path);
        }
    }

    pub fn is_skipped(&self, tool: &str) -> bool {
        self.skip_tools.iter().any(|t| t == tool)
    }
}

/// Success ratios.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Thresholds {
    /// Whole-run and prerequisite threshold.
    pub run: f64,
    /// Per-category threshold (security tools, python tools, verification).
    pub category: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            run: 0.8,
            category: 0.75,
        }
    }
}

/// Timeouts in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timeouts {
    pub verify_secs: u64,
    pub install_secs: u64,
    pub refresh_secs: u64,
    pub network_probe_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            verify_secs: 10,
            install_secs: 600,
            refresh_secs: 120,
            network_probe_secs: 5,
        }
    }
}

impl Timeouts {
    pub fn verify(&self) -> Duration {
        Duration::from_secs(self.verify_secs)
    }

    pub fn install(&self) -> Duration {
        Duration::from_secs(self.install_secs)
    }

    pub fn refresh(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }

    pub fn network_probe(&self) -> Duration {
        Duration::from_secs(self.network_probe_secs)
    }
}

/// Reachability probe targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    /// `host:port` pairs tried with a raw TCP connect.
    pub tcp_targets: Vec<String>,
    /// URLs tried with an HTTPS GET when TCP fails.
    pub http_targets: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            tcp_targets: DEFAULT_TCP_TARGETS.iter().map(|s| s.to_string()).collect(),
            http_targets: DEFAULT_HTTP_TARGETS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Host locations the installer reads or writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub log_file: PathBuf,
    pub system_bin: PathBuf,
    pub local_bin: PathBuf,
    pub go_bin: PathBuf,
    pub snap_bin: PathBuf,
    /// Parent of the per-tool virtual environments.
    pub venv_root: PathBuf,
    /// Virtual environment holding the report libraries.
    pub report_venv: PathBuf,
    pub testssl_system_dir: PathBuf,
    pub testssl_home_dir: PathBuf,
    pub repository_file: PathBuf,
    pub repository_backup: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home = home_dir();
        Self {
            log_file: home.join("reconkit_install.log"),
            system_bin: PathBuf::from("/usr/local/bin"),
            local_bin: home.join(".local/bin"),
            go_bin: home.join("go/bin"),
            snap_bin: PathBuf::from("/snap/bin"),
            venv_root: home.join(".local/venvs"),
            report_venv: home.join(".reconkit/venv_report"),
            testssl_system_dir: PathBuf::from("/opt/testssl.sh"),
            testssl_home_dir: home.join(".local/testssl.sh"),
            repository_file: PathBuf::from("/etc/apt/sources.list"),
            repository_backup: PathBuf::from("/etc/apt/sources.list.backup"),
        }
    }
}
