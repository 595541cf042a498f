//! Strategy chain behaviour through the public API.

use reconkit::config::InstallerConfig;
use reconkit::environment::{OsFamily, SystemInfo};
use reconkit::error::ErrorKind;
use reconkit::orchestrator::{ToolReport, ToolStatus};
use reconkit::resolver::{
    Category, InstallContext, InstallationMethod, Resolution, ResolvedVia, StrategyChain, Tier,
    Tool, VerificationGate,
};
use reconkit::shell::{CommandSpec, FakeRunner, InterruptFlag};
use reconkit::ResolverError;

fn bare_host() -> SystemInfo {
    SystemInfo {
        os_family: OsFamily::Linux,
        distribution: "Ubuntu".into(),
        distribution_id: "ubuntu".into(),
        architecture: "x86_64".into(),
        runtime_version: None,
        externally_managed: false,
        package_manager: None,
        network_reachable: true,
    }
}

fn nmap() -> Tool {
    Tool::new("nmap", "network scanner", Category::Security)
        .primary(InstallationMethod::command(CommandSpec::new([
            "apt-get", "install", "-y", "nmap",
        ])))
        .alternative(
            InstallationMethod::command(CommandSpec::new(["snap", "install", "nmap"]))
                .needs_network(),
        )
}

fn resolve(runner: &FakeRunner, tool: &Tool, network: bool) -> reconkit::Result<Resolution> {
    let system = bare_host();
    let config = InstallerConfig::default();
    let interrupt = InterruptFlag::detached();
    let ctx = InstallContext {
        runner,
        system: &system,
        config: &config,
        search_path: &[],
        interrupt: &interrupt,
        network_available: network,
    };
    let gate = VerificationGate::new(runner, &[]);
    StrategyChain::new(&ctx, &gate).resolve(tool)
}

#[test]
fn falls_back_to_alternative_when_package_manager_is_missing() {
    let runner = FakeRunner::new().installs(&["snap", "install", "nmap"], "nmap");
    let tool = nmap();

    let resolution = resolve(&runner, &tool, true).unwrap();

    let Resolution::Resolved { via, attempts } = &resolution else {
        panic!("expected nmap to resolve, got {resolution:?}");
    };
    assert_eq!(*via, ResolvedVia::Alternative);
    assert_eq!(attempts.len(), 2);
    assert!(!attempts[0].succeeded);
    assert_eq!(attempts[0].tier, Tier::Primary);
    assert_eq!(attempts[0].error_kind, Some(ErrorKind::CommandNotFound));
    assert!(attempts[1].succeeded);

    let report = ToolReport::from_resolution(&tool, resolution);
    assert_eq!(report.status, ToolStatus::AlternativeMethod);
}

#[test]
fn installed_tool_makes_no_attempts() {
    let runner = FakeRunner::new().installed("nmap");

    let resolution = resolve(&runner, &nmap(), true).unwrap();

    assert_eq!(
        resolution,
        Resolution::Resolved {
            via: ResolvedVia::AlreadyInstalled,
            attempts: vec![],
        }
    );
    assert!(!runner.was_called(&["apt-get"]));
}

#[test]
fn offline_network_method_is_recorded_but_not_run() {
    let runner = FakeRunner::new().installs(&["snap", "install", "nmap"], "nmap");

    let resolution = resolve(&runner, &nmap(), false).unwrap();

    assert!(!resolution.is_resolved());
    let attempts = resolution.attempts();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[1].error_kind, Some(ErrorKind::NetworkUnavailable));
    assert!(!runner.was_called(&["snap"]));
}

#[test]
fn interrupt_stops_resolution() {
    let runner = FakeRunner::new();
    let system = bare_host();
    let config = InstallerConfig::default();
    let interrupt = InterruptFlag::detached();
    interrupt.raise();
    let ctx = InstallContext {
        runner: &runner,
        system: &system,
        config: &config,
        search_path: &[],
        interrupt: &interrupt,
        network_available: true,
    };
    let gate = VerificationGate::new(&runner, &[]);

    let err = StrategyChain::new(&ctx, &gate).resolve(&nmap()).unwrap_err();

    assert!(matches!(err, ResolverError::Interrupted));
    assert!(runner.calls().is_empty());
}
