//! Install methods backed by the system package manager.
//!
//! The detected manager's plain install comes first. Fallbacks cover the
//! usual apt breakage (missing indexes, recommends pulling in broken
//! packages) and finally any other manager found on the host.

use crate::environment::{PackageManager, SystemInfo};
use crate::error::{ResolverError, Result};
use crate::resolver::{InstallContext, InstallationMethod};
use crate::shell::CommandSpec;
use tracing::debug;

/// Refresh the index (best-effort), then install.
pub fn install_with_refresh(
    ctx: &InstallContext<'_>,
    manager: PackageManager,
    packages: &[&str],
) -> Result<()> {
    if !ctx.succeeds(&manager.refresh())? {
        debug!(manager = %manager, "index refresh failed, installing anyway");
    }
    ctx.run(&manager.install(packages)).map(|_| ())
}

/// The standard install through the detected package manager.
pub fn package_install(system: &SystemInfo, package: &str) -> InstallationMethod {
    let package = package.to_string();
    let method = match system.package_manager {
        Some(manager) => {
            InstallationMethod::native(format!("{manager} install {package}"), move |ctx| {
                install_with_refresh(ctx, manager, &[package.as_str()])
            })
        }
        None => InstallationMethod::native(format!("package manager install {package}"), |_| {
            Err(ResolverError::CommandNotFound {
                program: "system package manager".to_string(),
            })
        }),
    };
    method.needs_network()
}

/// Recovery methods tried after [`package_install`].
pub fn package_fallbacks(system: &SystemInfo, package: &str) -> Vec<InstallationMethod> {
    let mut methods = Vec::new();

    if system.package_manager == Some(PackageManager::Apt) {
        let apt = PackageManager::Apt;
        methods.push(
            InstallationMethod::command(apt.install_with(&[package], &["--fix-missing"]))
                .needs_network(),
        );
        methods.push(
            InstallationMethod::command(apt.install_with(&[package], &["--no-install-recommends"]))
                .needs_network(),
        );

        let name = package.to_string();
        methods.push(
            InstallationMethod::native(format!("forced refresh and install {package}"), move |ctx| {
                let update = CommandSpec::new(["apt-get", "update", "--fix-missing"])
                    .sudo()
                    .timeout(ctx.config.timeouts.refresh());
                ctx.run(&update)?;
                ctx.run(&CommandSpec::new(["apt-get", "clean"]).sudo())?;
                ctx.run(&apt.install(&[name.as_str()])).map(|_| ())
            })
            .needs_network(),
        );
    }

    let detected = system.package_manager;
    let name = package.to_string();
    methods.push(
        InstallationMethod::native(format!("other package managers: {package}"), move |ctx| {
            other_managers_install(ctx, detected, &name)
        })
        .needs_network(),
    );

    methods
}

/// Every manager, the detected one first.
pub fn preferred_managers(detected: Option<PackageManager>) -> Vec<PackageManager> {
    detected
        .into_iter()
        .chain(PackageManager::ALL.into_iter().filter(|m| Some(*m) != detected))
        .collect()
}

fn other_managers_install(
    ctx: &InstallContext<'_>,
    detected: Option<PackageManager>,
    package: &str,
) -> Result<()> {
    let mut last_error = None;
    for manager in preferred_managers(detected).into_iter().skip(usize::from(detected.is_some())) {
        if !ctx.has_program(manager.program()) {
            continue;
        }
        match install_with_refresh(ctx, manager, &[package]) {
            Ok(()) => return Ok(()),
            Err(e) if e.is_interrupt() => return Err(e),
            Err(e) => last_error = Some(e),
        }
    }
    Err(last_error.unwrap_or_else(|| ResolverError::CommandNotFound {
        program: "alternative package manager".to_string(),
    }))
}

/// Distribution package name for a generic tool name.
pub fn package_name(manager: Option<PackageManager>, tool: &str) -> String {
    match (manager, tool) {
        (Some(PackageManager::Apt) | None, name) => name.to_string(),
        (Some(PackageManager::Brew), "python3-pip") => "python".to_string(),
        (Some(PackageManager::Pacman), "python3-pip") => "python-pip".to_string(),
        (Some(PackageManager::Pacman), "python3-virtualenv") => "python-virtualenv".to_string(),
        (Some(PackageManager::Pacman), "python3") => "python".to_string(),
        (Some(PackageManager::Brew), "python3") => "python".to_string(),
        (Some(PackageManager::Brew), "python3-virtualenv") => "virtualenv".to_string(),
        (Some(PackageManager::Pacman), "build-essential") => "base-devel".to_string(),
        (Some(_), "build-essential") => "gcc".to_string(),
        (Some(_), name) => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{Category, Resolution, Tool};
    use crate::shell::FakeRunner;
    use crate::test_support::{debian, TestHost};

    fn nmap(system: &SystemInfo) -> Tool {
        Tool::new("nmap", "Network Mapper", Category::Security)
            .primary(package_install(system, "nmap"))
            .alternatives(package_fallbacks(system, "nmap"))
    }

    #[test]
    fn standard_install_refreshes_then_installs() {
        let runner = FakeRunner::new()
            .succeeds(&["apt-get", "update"])
            .installs(&["apt-get", "install", "-y", "nmap"], "nmap");
        let host = TestHost::new(runner);

        let resolution = host.resolve(&nmap(&host.system)).unwrap();

        assert!(resolution.is_resolved());
        assert_eq!(
            host.runner.call_lines()[1..3],
            ["apt-get update", "apt-get install -y nmap"]
        );
        assert!(host.runner.calls()[2].requires_sudo);
    }

    #[test]
    fn refresh_failure_does_not_block_install() {
        let runner = FakeRunner::new()
            .fails(&["apt-get", "update"], 100)
            .installs(&["apt-get", "install", "-y", "nmap"], "nmap");
        let host = TestHost::new(runner);

        assert!(host.resolve(&nmap(&host.system)).unwrap().is_resolved());
    }

    #[test]
    fn apt_fallbacks_run_in_order() {
        let runner = FakeRunner::new()
            .succeeds(&["apt-get", "update"])
            .fails(&["apt-get", "install"], 100)
            .installs(&["apt-get", "install", "-y", "--no-install-recommends"], "nmap");
        let host = TestHost::new(runner);

        let resolution = host.resolve(&nmap(&host.system)).unwrap();

        let methods: Vec<_> = resolution.attempts().iter().map(|a| a.method.clone()).collect();
        assert_eq!(
            methods,
            vec![
                "apt install nmap".to_string(),
                "sudo apt-get install -y --fix-missing nmap".to_string(),
                "sudo apt-get install -y --no-install-recommends nmap".to_string(),
            ]
        );
        assert!(resolution.is_resolved());
    }

    #[test]
    fn missing_package_manager_fails_primary() {
        let host = TestHost::new(FakeRunner::new()).with_system(debian(None));
        let tool = nmap(&host.system);

        assert_eq!(tool.alternative_methods.len(), 1);
        let resolution = host.resolve(&tool).unwrap();
        let Resolution::Unresolved { attempts } = resolution else {
            panic!("expected unresolved");
        };
        assert_eq!(attempts.len(), 2);
        assert_eq!(
            attempts[0].error_kind,
            Some(crate::error::ErrorKind::CommandNotFound)
        );
    }

    #[test]
    fn detected_manager_comes_first() {
        let order = preferred_managers(Some(PackageManager::Pacman));
        assert_eq!(order[0], PackageManager::Pacman);
        assert_eq!(order.len(), PackageManager::ALL.len());
        assert_eq!(preferred_managers(None), PackageManager::ALL);
    }

    #[test]
    fn package_names_follow_the_manager() {
        assert_eq!(package_name(Some(PackageManager::Apt), "build-essential"), "build-essential");
        assert_eq!(package_name(Some(PackageManager::Dnf), "build-essential"), "gcc");
        assert_eq!(package_name(Some(PackageManager::Pacman), "python3-pip"), "python-pip");
        assert_eq!(package_name(None, "nmap"), "nmap");
    }
}
