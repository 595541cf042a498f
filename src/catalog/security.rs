//! Recon tools: amass, httpx, nmap and testssl.sh.

use super::packages::{package_fallbacks, package_install, preferred_managers};
use crate::config::InstallerConfig;
use crate::environment::{PackageManager, SystemInfo};
use crate::error::{ResolverError, Result};
use crate::host::{Downloader, ProfileMutator};
use crate::resolver::{Category, InstallContext, InstallationMethod, Tool};
use crate::shell::CommandSpec;
use anyhow::anyhow;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info, warn};

const SNAP_TIMEOUT: Duration = Duration::from_secs(300);
const CLONE_TIMEOUT: Duration = Duration::from_secs(300);

pub const AMASS_GO_MODULE: &str = "github.com/owasp-amass/amass/v4/...@master";
pub const AMASS_RELEASE: &str = "v4.2.0";
pub const HTTPX_GO_MODULE: &str = "github.com/projectdiscovery/httpx/cmd/httpx@latest";
pub const HTTPX_REPO: &str = "https://github.com/projectdiscovery/httpx.git";
pub const TESTSSL_REPO: &str = "https://github.com/drwetter/testssl.sh.git";
pub const TESTSSL_VERSION: &str = "3.0.8";

fn arg(path: &Path) -> String {
    path.display().to_string()
}

/// Release archive URL for `arch` (`amd64` / `arm64`).
pub fn amass_release_url(arch: &str) -> String {
    format!(
        "https://github.com/owasp-amass/amass/releases/download/{AMASS_RELEASE}/amass_Linux_{arch}.zip"
    )
}

pub fn testssl_archive_url() -> String {
    format!("https://github.com/drwetter/testssl.sh/archive/{TESTSSL_VERSION}.tar.gz")
}

/// Make `snap` available, installing snapd through any package manager.
fn ensure_snapd(ctx: &InstallContext<'_>) -> Result<()> {
    if !ctx.has_program("snap") {
        let managers = preferred_managers(ctx.system.package_manager)
            .into_iter()
            .filter(|m| m.needs_sudo() && ctx.has_program(m.program()));
        let mut installed = false;
        for manager in managers {
            ctx.succeeds(&manager.refresh())?;
            if ctx.succeeds(&manager.install(&["snapd"]))? {
                installed = true;
                break;
            }
        }
        if !installed {
            return Err(ResolverError::CommandNotFound {
                program: "snap".to_string(),
            });
        }
    }

    let socket = CommandSpec::new(["systemctl", "enable", "--now", "snapd.socket"]).sudo();
    if !ctx.succeeds(&socket)? {
        debug!("could not enable snapd.socket");
    }
    Ok(())
}

/// Replace any distro amass with the snap and put `/snap/bin` on PATH.
fn amass_snap(ctx: &InstallContext<'_>) -> Result<()> {
    if ctx.has_program("dpkg") && ctx.succeeds(&CommandSpec::new(["dpkg", "-s", "amass"]))? {
        info!("removing distribution amass package");
        let apt = PackageManager::Apt;
        ctx.succeeds(&apt.remove(&["amass"]))?;
        ctx.succeeds(&CommandSpec::new(["apt-get", "autoremove", "-y"]).sudo())?;
    }

    ensure_snapd(ctx)?;
    let install = CommandSpec::new(["snap", "install", "amass"])
        .sudo()
        .timeout(SNAP_TIMEOUT);
    ctx.run(&install)?;

    let line = format!(
        "export PATH=\"{}:$PATH\"",
        ctx.config.paths.snap_bin.display()
    );
    ProfileMutator::new(ctx.config.profiles.clone()).ensure_lines_in_existing(&[line]);
    Ok(())
}

/// Link `<go_bin>/<program>` into the system bin directory (best-effort).
fn link_go_binary(ctx: &InstallContext<'_>, program: &str) -> Result<()> {
    let source = ctx.config.paths.go_bin.join(program);
    let target = ctx.config.paths.system_bin.join(program);
    let link = CommandSpec::new(["ln".to_string(), "-sf".to_string(), arg(&source), arg(&target)]).sudo();
    if !ctx.succeeds(&link)? {
        warn!(program, "could not link go binary into system bin");
    }
    Ok(())
}

fn go_install(ctx: &InstallContext<'_>, module: &str, program: &str) -> Result<()> {
    let spec = CommandSpec::new(["go", "install", "-v", module]).timeout(ctx.config.timeouts.install());
    ctx.run(&spec)?;
    link_go_binary(ctx, program)
}

/// Copy `binary` to `<system_bin>/<program>` and mark it executable.
fn install_binary(ctx: &InstallContext<'_>, binary: &Path, program: &str) -> Result<()> {
    let target = arg(&ctx.config.paths.system_bin.join(program));
    ctx.run(&CommandSpec::new(["cp".to_string(), arg(binary), target.clone()]).sudo())?;
    ctx.run(&CommandSpec::new(["chmod".to_string(), "+x".to_string(), target]).sudo())?;
    Ok(())
}

fn amass_release(ctx: &InstallContext<'_>) -> Result<()> {
    let arch = ctx.system.release_arch().ok_or_else(|| {
        anyhow!(
            "no amass release for architecture {}",
            ctx.system.architecture
        )
    })?;
    let temp = TempDir::new()?;
    let archive = temp.path().join("amass.zip");
    Downloader::new(ctx.runner, ctx.search_path).fetch(&amass_release_url(arch), &archive)?;

    let out = arg(temp.path());
    ctx.run(&CommandSpec::new(["unzip".to_string(), "-o".to_string(), arg(&archive), "-d".to_string(), out]))?;
    let binary = temp.path().join(format!("amass_Linux_{arch}")).join("amass");
    install_binary(ctx, &binary, "amass")
}

pub fn amass() -> Tool {
    Tool::new("amass", "In-depth attack surface mapping", Category::Security)
        .check(["amass", "version"])
        .primary(InstallationMethod::native("snap install amass", amass_snap).needs_network())
        .alternatives([
            InstallationMethod::native("go install amass", |ctx| {
                go_install(ctx, AMASS_GO_MODULE, "amass")
            })
            .needs_network(),
            InstallationMethod::native(format!("amass {AMASS_RELEASE} release archive"), amass_release)
                .needs_network(),
        ])
}

fn httpx_from_source(ctx: &InstallContext<'_>) -> Result<()> {
    let temp = TempDir::new()?;
    let checkout = temp.path().join("httpx");
    let clone = CommandSpec::new(["git".to_string(), "clone".to_string(), HTTPX_REPO.to_string(), arg(&checkout)])
        .timeout(CLONE_TIMEOUT);
    ctx.run(&clone)?;

    let build = CommandSpec::new(["go", "build"])
        .in_dir(checkout.join("cmd/httpx"))
        .timeout(ctx.config.timeouts.install());
    ctx.run(&build)?;
    install_binary(ctx, &checkout.join("cmd/httpx/httpx"), "httpx")
}

pub fn httpx() -> Tool {
    Tool::new("httpx", "Fast HTTP probing toolkit", Category::Security)
        .check(["httpx", "-version"])
        .primary(
            InstallationMethod::native("go install httpx", |ctx| {
                go_install(ctx, HTTPX_GO_MODULE, "httpx")
            })
            .needs_network(),
        )
        .alternative(InstallationMethod::native("build httpx from source", httpx_from_source).needs_network())
}

pub fn nmap(system: &SystemInfo) -> Tool {
    Tool::new("nmap", "Network Mapper", Category::Security)
        .primary(package_install(system, "nmap"))
        .alternatives(package_fallbacks(system, "nmap"))
}

/// Fetch testssl.sh into `dir` with git, or from the release archive.
fn fetch_testssl(ctx: &InstallContext<'_>, dir: &Path, sudo: bool) -> Result<()> {
    if dir.exists() {
        ctx.run(&CommandSpec::new(["rm".to_string(), "-rf".to_string(), arg(dir)]).sudo_if(sudo))?;
    }
    if let Some(parent) = dir.parent() {
        ctx.run(&CommandSpec::new(["mkdir".to_string(), "-p".to_string(), arg(parent)]).sudo_if(sudo))?;
    }

    let clone = CommandSpec::new(["git".to_string(), "clone".to_string(), TESTSSL_REPO.to_string(), arg(dir)])
        .sudo_if(sudo)
        .timeout(CLONE_TIMEOUT);
    if ctx.succeeds(&clone)? {
        return Ok(());
    }

    warn!("git clone of testssl.sh failed, trying release archive");
    let temp = TempDir::new()?;
    let archive = temp.path().join("testssl.tar.gz");
    Downloader::new(ctx.runner, ctx.search_path).fetch(&testssl_archive_url(), &archive)?;
    ctx.run(&CommandSpec::new([
        "tar".to_string(),
        "-xzf".to_string(),
        arg(&archive),
        "-C".to_string(),
        arg(temp.path()),
    ]))?;
    let extracted = temp.path().join(format!("testssl.sh-{TESTSSL_VERSION}"));
    ctx.run(&CommandSpec::new(["mv".to_string(), arg(&extracted), arg(dir)]).sudo_if(sudo))?;
    Ok(())
}

fn link_testssl(ctx: &InstallContext<'_>, dir: &Path, bin_dir: &Path, sudo: bool) -> Result<()> {
    let script = arg(&dir.join("testssl.sh"));
    ctx.run(&CommandSpec::new(["chmod".to_string(), "+x".to_string(), script.clone()]).sudo_if(sudo))?;
    if !sudo {
        fs::create_dir_all(bin_dir)?;
    }
    let link = arg(&bin_dir.join("testssl.sh"));
    ctx.run(&CommandSpec::new(["ln".to_string(), "-sf".to_string(), script, link]).sudo_if(sudo))?;
    Ok(())
}

pub fn testssl(config: &InstallerConfig) -> Tool {
    let system_dir = config.paths.testssl_system_dir.clone();
    let home_dir = config.paths.testssl_home_dir.clone();

    Tool::new("testssl.sh", "TLS/SSL configuration scanner", Category::Security)
        .primary(
            InstallationMethod::native(format!("clone into {}", system_dir.display()), move |ctx| {
                fetch_testssl(ctx, &system_dir, true)?;
                link_testssl(ctx, &system_dir, &ctx.config.paths.system_bin, true)
            })
            .needs_network(),
        )
        .alternative(
            InstallationMethod::native(format!("clone into {}", home_dir.display()), move |ctx| {
                fetch_testssl(ctx, &home_dir, false)?;
                link_testssl(ctx, &home_dir, &ctx.config.paths.local_bin, false)
            })
            .needs_network(),
        )
}

/// amass, httpx, nmap, testssl.sh.
pub fn security_tools(system: &SystemInfo, config: &InstallerConfig) -> Vec<Tool> {
    vec![amass(), httpx(), nmap(system), testssl(config)]
}
