//! System package manager detection and command construction.

use crate::shell::{find_program, CommandSpec};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Timeout for package installs.
pub const INSTALL_TIMEOUT: Duration = Duration::from_secs(300);

/// Timeout for index refreshes.
pub const REFRESH_TIMEOUT: Duration = Duration::from_secs(120);

/// Supported system package managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Apt,
    Dnf,
    Yum,
    Pacman,
    Zypper,
    Brew,
}

impl PackageManager {
    /// Detection order.
    pub const ALL: [PackageManager; 6] = [
        PackageManager::Apt,
        PackageManager::Dnf,
        PackageManager::Yum,
        PackageManager::Pacman,
        PackageManager::Zypper,
        PackageManager::Brew,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Apt => "apt",
            Self::Dnf => "dnf",
            Self::Yum => "yum",
            Self::Pacman => "pacman",
            Self::Zypper => "zypper",
            Self::Brew => "brew",
        }
    }

    /// The executable invoked for installs.
    pub fn program(self) -> &'static str {
        match self {
            Self::Apt => "apt-get",
            other => other.name(),
        }
    }

    /// Homebrew refuses to run as root.
    pub fn needs_sudo(self) -> bool {
        !matches!(self, Self::Brew)
    }

    /// Install `packages` non-interactively, with extra options before the
    /// package names.
    pub fn install_with(self, packages: &[&str], options: &[&str]) -> CommandSpec {
        let mut argv: Vec<String> = match self {
            Self::Apt | Self::Dnf | Self::Yum => {
                vec![self.program().into(), "install".into(), "-y".into()]
            }
            Self::Pacman => vec!["pacman".into(), "-S".into(), "--noconfirm".into()],
            Self::Zypper => vec![
                "zypper".into(),
                "--non-interactive".into(),
                "install".into(),
            ],
            Self::Brew => vec!["brew".into(), "install".into()],
        };
        argv.extend(options.iter().map(|s| s.to_string()));
        argv.extend(packages.iter().map(|s| s.to_string()));
        CommandSpec::new(argv)
            .sudo_if(self.needs_sudo())
            .timeout(INSTALL_TIMEOUT)
    }

    pub fn install(self, packages: &[&str]) -> CommandSpec {
        self.install_with(packages, &[])
    }

    /// Refresh the package index.
    pub fn refresh(self) -> CommandSpec {
        let argv: &[&str] = match self {
            Self::Apt => &["apt-get", "update"],
            Self::Dnf => &["dnf", "makecache"],
            Self::Yum => &["yum", "makecache"],
            Self::Pacman => &["pacman", "-Sy"],
            Self::Zypper => &["zypper", "--non-interactive", "refresh"],
            Self::Brew => &["brew", "update"],
        };
        CommandSpec::new(argv.iter().copied())
            .sudo_if(self.needs_sudo())
            .timeout(REFRESH_TIMEOUT)
    }

    /// Remove `packages`.
    pub fn remove(self, packages: &[&str]) -> CommandSpec {
        let mut argv: Vec<String> = match self {
            Self::Apt | Self::Dnf | Self::Yum => {
                vec![self.program().into(), "remove".into(), "-y".into()]
            }
            Self::Pacman => vec!["pacman".into(), "-R".into(), "--noconfirm".into()],
            Self::Zypper => vec![
                "zypper".into(),
                "--non-interactive".into(),
                "remove".into(),
            ],
            Self::Brew => vec!["brew".into(), "uninstall".into()],
        };
        argv.extend(packages.iter().map(|s| s.to_string()));
        CommandSpec::new(argv)
            .sudo_if(self.needs_sudo())
            .timeout(REFRESH_TIMEOUT)
    }
}

impl std::fmt::Display for PackageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Find the first available package manager on `path`.
pub fn detect(path: &[PathBuf]) -> Option<PackageManager> {
    PackageManager::ALL
        .into_iter()
        .find(|pm| find_program(pm.program(), path).is_some())
}
