//! Python tooling: pip, virtualenvs, the report dependencies and the
//! pip-installed recon tools.
//!
//! Tools get a dedicated virtualenv under the venv root and a wrapper
//! script in the system bin directory, so they work on hosts where the
//! system interpreter refuses `pip install`.

use super::packages::{package_fallbacks, package_install, package_name};
use crate::config::InstallerConfig;
use crate::environment::SystemInfo;
use crate::error::{ResolverError, Result};
use crate::host::{write_privileged, Downloader, SourcePatch};
use crate::resolver::{Category, InstallContext, InstallationMethod, Tool};
use crate::shell::CommandSpec;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

pub const GET_PIP_URL: &str = "https://bootstrap.pypa.io/get-pip.py";

/// Packages the report generator imports.
pub const REPORT_PACKAGES: [&str; 2] = ["pandas", "openpyxl"];

/// `<venv>/bin/<program>`.
pub fn venv_bin(venv: &Path, program: &str) -> PathBuf {
    venv.join("bin").join(program)
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

/// Create `venv` unless it already has an interpreter.
///
/// Tries `python3 -m venv`, `virtualenv`, then `python3 -m virtualenv`.
pub fn create_venv(ctx: &InstallContext<'_>, venv: &Path) -> Result<()> {
    if venv_bin(venv, "python").exists() {
        debug!(venv = %venv.display(), "virtualenv exists");
        return Ok(());
    }
    if let Some(parent) = venv.parent() {
        fs::create_dir_all(parent)?;
    }

    let dir = path_arg(venv);
    let attempts = [
        CommandSpec::new(["python3", "-m", "venv", dir.as_str()]),
        CommandSpec::new(["virtualenv", dir.as_str()]),
        CommandSpec::new(["python3", "-m", "virtualenv", dir.as_str()]),
    ];
    let mut last_error = None;
    for spec in attempts {
        match ctx.run(&spec.timeout(ctx.config.timeouts.install())) {
            Ok(_) => {
                info!(venv = %venv.display(), "created virtualenv");
                return Ok(());
            }
            Err(e) if e.is_interrupt() => return Err(e),
            Err(e) => {
                warn!(venv = %venv.display(), error = %e, "virtualenv creation failed");
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or(ResolverError::CommandFailed {
        command: format!("create virtualenv {dir}"),
        code: None,
    }))
}

/// Upgrade pip (best-effort) and install `packages` into `venv`, retrying
/// each through `python -m pip`.
pub fn pip_install_into(ctx: &InstallContext<'_>, venv: &Path, packages: &[&str]) -> Result<()> {
    let python = path_arg(&venv_bin(venv, "python"));
    let pip = path_arg(&venv_bin(venv, "pip"));
    let timeout = ctx.config.timeouts.install();

    let upgrade = CommandSpec::new([python.as_str(), "-m", "pip", "install", "--upgrade", "pip"]);
    if !ctx.succeeds(&upgrade.timeout(timeout))? {
        warn!(venv = %venv.display(), "could not upgrade pip");
    }

    for &package in packages {
        let direct = CommandSpec::new([pip.as_str(), "install", package]).timeout(timeout);
        if ctx.succeeds(&direct)? {
            continue;
        }
        let retry = CommandSpec::new([python.as_str(), "-m", "pip", "install", package]);
        ctx.run(&retry.timeout(timeout))?;
    }
    Ok(())
}

/// `python3 -m pip install --user`, adding `--break-system-packages` on
/// externally managed interpreters.
pub fn user_pip_install(ctx: &InstallContext<'_>, packages: &[&str]) -> Result<()> {
    let mut argv = vec!["python3", "-m", "pip", "install", "--user"];
    if ctx.system.externally_managed {
        argv.push("--break-system-packages");
    }
    argv.extend_from_slice(packages);
    ctx.run(&CommandSpec::new(argv).timeout(ctx.config.timeouts.install()))
        .map(|_| ())
}

/// Install a `#!/bin/bash` wrapper forwarding to the venv entry point.
pub fn write_wrapper(ctx: &InstallContext<'_>, program: &str, venv: &Path) -> Result<PathBuf> {
    let target = ctx.config.paths.system_bin.join(program);
    let content = format!(
        "#!/bin/bash\n{} \"$@\"\n",
        venv_bin(venv, program).display()
    );
    write_privileged(ctx.runner, &target, content.as_bytes(), 0o755)?;
    info!(wrapper = %target.display(), "installed wrapper script");
    Ok(target)
}

fn venv_tool_install(ctx: &InstallContext<'_>, program: &str, package: &str) -> Result<()> {
    let venv = ctx.config.paths.venv_root.join(format!("{program}_env"));
    create_venv(ctx, &venv)?;
    pip_install_into(ctx, &venv, &[package])?;
    write_wrapper(ctx, program, &venv)?;
    Ok(())
}

fn pipx_install(ctx: &InstallContext<'_>, package: &str) -> Result<()> {
    if !ctx.has_program("pipx") {
        return Err(ResolverError::CommandNotFound {
            program: "pipx".to_string(),
        });
    }
    let spec = CommandSpec::new(["pipx", "install", package]).timeout(ctx.config.timeouts.install());
    ctx.run(&spec).map(|_| ())
}

/// A pip-distributed command-line tool.
pub fn python_tool(name: &str, description: &str, config: &InstallerConfig) -> Tool {
    let venv = config.paths.venv_root.join(format!("{name}_env"));
    let (program, package) = (name.to_string(), name.to_string());
    let (pipx_pkg, user_pkg) = (name.to_string(), name.to_string());

    Tool::new(name, description, Category::Python)
        .check([name, "--help"])
        .primary(
            InstallationMethod::native(format!("virtualenv {}", venv.display()), move |ctx| {
                venv_tool_install(ctx, &program, &package)
            })
            .needs_network(),
        )
        .alternatives([
            InstallationMethod::native(format!("pipx install {name}"), move |ctx| {
                pipx_install(ctx, &pipx_pkg)
            })
            .needs_network(),
            InstallationMethod::native(format!("pip install --user {name}"), move |ctx| {
                user_pip_install(ctx, &[user_pkg.as_str()])
            })
            .needs_network(),
        ])
}

/// checkdmarc and dnstwist.
pub fn python_tools(config: &InstallerConfig) -> Vec<Tool> {
    vec![
        python_tool("checkdmarc", "DMARC record checker", config)
            .hook(SourcePatch::checkdmarc_mta_sts().into_hook()),
        python_tool("dnstwist", "Domain name permutation engine", config),
    ]
}

/// Create the report virtualenv, falling back to a user-installed
/// `virtualenv` on externally managed interpreters.
fn ensure_report_venv(ctx: &InstallContext<'_>, venv: &Path) -> Result<()> {
    match create_venv(ctx, venv) {
        Ok(()) => Ok(()),
        Err(e) if e.is_interrupt() || !ctx.system.externally_managed => Err(e),
        Err(e) => {
            warn!(error = %e, "retrying with a user-installed virtualenv");
            let bootstrap = CommandSpec::new([
                "python3",
                "-m",
                "pip",
                "install",
                "--user",
                "--break-system-packages",
                "virtualenv",
            ]);
            ctx.run(&bootstrap.timeout(ctx.config.timeouts.install()))?;
            let dir = path_arg(venv);
            ctx.run(&CommandSpec::new(["python3", "-m", "virtualenv", dir.as_str()]))?;
            Ok(())
        }
    }
}

/// pandas and openpyxl, checked by importing them from the report venv.
pub fn report_dependencies(config: &InstallerConfig) -> Vec<Tool> {
    let venv = config.paths.report_venv.clone();
    let python = path_arg(&venv_bin(&venv, "python"));

    REPORT_PACKAGES
        .iter()
        .map(|package| {
            let (primary_venv, alt_venv) = (venv.clone(), venv.clone());
            let (primary_pkg, alt_pkg) = (package.to_string(), package.to_string());
            Tool::new(*package, "report generation dependency", Category::ReportDependency)
                .check([python.clone(), "-c".to_string(), format!("import {package}")])
                .primary(
                    InstallationMethod::native(format!("report venv: pip install {package}"), move |ctx| {
                        ensure_report_venv(ctx, &primary_venv)?;
                        pip_install_into(ctx, &primary_venv, &[primary_pkg.as_str()])
                    })
                    .needs_network(),
                )
                .alternative(
                    InstallationMethod::native(
                        format!("report venv: pip install --no-cache-dir {package}"),
                        move |ctx| {
                            ensure_report_venv(ctx, &alt_venv)?;
                            let python = path_arg(&venv_bin(&alt_venv, "python"));
                            let spec = CommandSpec::new([
                                python.as_str(),
                                "-m",
                                "pip",
                                "install",
                                "--no-cache-dir",
                                "--force-reinstall",
                                alt_pkg.as_str(),
                            ]);
                            ctx.run(&spec.timeout(ctx.config.timeouts.install())).map(|_| ())
                        },
                    )
                    .needs_network(),
                )
        })
        .collect()
}

/// pip, bootstrapped from the package manager, `get-pip.py` or `ensurepip`.
pub fn pip(system: &SystemInfo) -> Tool {
    let package = package_name(system.package_manager, "python3-pip");
    Tool::new("pip", "Python package installer", Category::Prerequisite)
        .check(["python3", "-m", "pip", "--version"])
        .primary(package_install(system, &package))
        .alternatives([
            InstallationMethod::native("get-pip.py --user", |ctx| {
                let temp = TempDir::new()?;
                let script = temp.path().join("get-pip.py");
                Downloader::new(ctx.runner, ctx.search_path).fetch(GET_PIP_URL, &script)?;
                let script = path_arg(&script);
                let spec = CommandSpec::new(["python3", script.as_str(), "--user"]);
                ctx.run(&spec.timeout(ctx.config.timeouts.install())).map(|_| ())
            })
            .needs_network(),
            InstallationMethod::command(CommandSpec::new([
                "python3",
                "-m",
                "ensurepip",
                "--upgrade",
            ])),
        ])
}

/// virtualenv, needed only where the interpreter is externally managed.
pub fn virtualenv(system: &SystemInfo) -> Tool {
    let package = package_name(system.package_manager, "python3-virtualenv");
    Tool::new("virtualenv", "Python virtual environment builder", Category::Prerequisite)
        .check(["python3", "-m", "virtualenv", "--version"])
        .primary(
            InstallationMethod::native("pip install --user virtualenv", |ctx| {
                user_pip_install(ctx, &["virtualenv"])
            })
            .needs_network(),
        )
        .alternative(package_install(system, &package))
        .alternatives(package_fallbacks(system, &package))
}

/// python3 at version 3.8 or newer.
pub fn python3(system: &SystemInfo) -> Tool {
    let package = package_name(system.package_manager, "python3");
    Tool::new("python3", "Python 3.8+ interpreter", Category::Prerequisite)
        .check([
            "python3",
            "-c",
            "import sys; sys.exit(0 if sys.version_info >= (3, 8) else 1)",
        ])
        .primary(package_install(system, &package))
        .alternatives(package_fallbacks(system, &package))
}
