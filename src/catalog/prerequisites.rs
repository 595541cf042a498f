//! Development tools every other install depends on.

use super::packages::{package_fallbacks, package_install, package_name};
use crate::environment::SystemInfo;
use crate::resolver::{Category, Tool};

/// Tools whose availability makes the development-tools check pass.
pub const DEV_TOOLS: [&str; 4] = ["curl", "wget", "git", "build-essential"];

/// Fewest development tools that must resolve.
pub const MIN_DEV_TOOLS: usize = 2;

fn dev_tool(system: &SystemInfo, name: &str, description: &str) -> Tool {
    let package = package_name(system.package_manager, name);
    Tool::new(name, description, Category::Prerequisite)
        .primary(package_install(system, &package))
        .alternatives(package_fallbacks(system, &package))
}

/// curl, wget, git and a C toolchain (checked through `gcc`).
pub fn dev_tools(system: &SystemInfo) -> Vec<Tool> {
    vec![
        dev_tool(system, "curl", "URL transfer tool"),
        dev_tool(system, "wget", "Network downloader"),
        dev_tool(system, "git", "Version control"),
        dev_tool(system, "build-essential", "C compiler and build tools").check(["gcc", "--version"]),
    ]
}

/// The development-tools check passes with at least [`MIN_DEV_TOOLS`]
/// resolved, one of them a downloader.
pub fn dev_tools_sufficient(resolved: &[&str]) -> bool {
    let has = |name: &str| resolved.iter().any(|r| *r == name);
    resolved.len() >= MIN_DEV_TOOLS && (has("curl") || has("wget"))
}
