//! Shared fixtures for unit tests.

use crate::config::InstallerConfig;
use crate::environment::{OsFamily, PackageManager, SystemInfo};
use crate::error::Result;
use crate::resolver::{InstallContext, Resolution, StrategyChain, Tool, VerificationGate};
use crate::shell::{FakeRunner, InterruptFlag};
use std::path::PathBuf;
use tempfile::TempDir;

pub fn debian(package_manager: Option<PackageManager>) -> SystemInfo {
    SystemInfo {
        os_family: OsFamily::Linux,
        distribution: "Debian GNU/Linux".into(),
        distribution_id: "debian".into(),
        architecture: "x86_64".into(),
        runtime_version: None,
        externally_managed: false,
        package_manager,
        network_reachable: true,
    }
}

/// A scripted host with its config paths under a temporary directory.
pub struct TestHost {
    pub runner: FakeRunner,
    pub system: SystemInfo,
    pub config: InstallerConfig,
    pub interrupt: InterruptFlag,
    pub search_path: Vec<PathBuf>,
    pub network: bool,
    pub temp: TempDir,
}

impl TestHost {
    pub fn new(runner: FakeRunner) -> Self {
        let temp = TempDir::new().expect("temp dir");
        let root = temp.path();
        let mut config = InstallerConfig::default();
        let paths = &mut config.paths;
        paths.log_file = root.join("install.log");
        paths.system_bin = root.join("usr/local/bin");
        paths.local_bin = root.join("home/.local/bin");
        paths.go_bin = root.join("home/go/bin");
        paths.snap_bin = root.join("snap/bin");
        paths.venv_root = root.join("home/.local/venvs");
        paths.report_venv = root.join("home/.reconkit/venv_report");
        paths.testssl_system_dir = root.join("opt/testssl.sh");
        paths.testssl_home_dir = root.join("home/.local/testssl.sh");
        paths.repository_file = root.join("etc/apt/sources.list");
        paths.repository_backup = root.join("etc/apt/sources.list.backup");
        config.profiles = vec![root.join("home/.bashrc"), root.join("home/.zshrc")];
        config.extra_path = Vec::new();

        Self {
            runner,
            system: debian(Some(PackageManager::Apt)),
            config,
            interrupt: InterruptFlag::detached(),
            search_path: Vec::new(),
            network: true,
            temp,
        }
    }

    pub fn with_system(mut self, system: SystemInfo) -> Self {
        self.system = system;
        self
    }

    pub fn offline(mut self) -> Self {
        self.network = false;
        self
    }

    pub fn ctx(&self) -> InstallContext<'_> {
        InstallContext {
            runner: &self.runner,
            system: &self.system,
            config: &self.config,
            search_path: &self.search_path,
            interrupt: &self.interrupt,
            network_available: self.network,
        }
    }

    pub fn resolve(&self, tool: &Tool) -> Result<Resolution> {
        let ctx = self.ctx();
        let gate = VerificationGate::new(&self.runner, &self.search_path);
        StrategyChain::new(&ctx, &gate).resolve(tool)
    }
}
