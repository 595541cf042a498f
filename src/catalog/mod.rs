//! Built-in tool definitions.
//!
//! The catalog is the fixed set of tools the installer knows about, each
//! with its check invocation and ordered install methods. It is built once
//! per run from the probed host and the configuration.

pub mod packages;
pub mod prerequisites;
pub mod python;
pub mod security;

use crate::config::InstallerConfig;
use crate::environment::SystemInfo;
use crate::resolver::{Category, Tool};

pub use packages::{package_fallbacks, package_install, package_name};
pub use prerequisites::{dev_tools, dev_tools_sufficient, DEV_TOOLS};
pub use python::{python_tools, report_dependencies, REPORT_PACKAGES};
pub use security::security_tools;

/// Every tool the installer can resolve.
pub struct Catalog {
    tools: Vec<Tool>,
}

impl Catalog {
    /// The built-in tools for this host.
    pub fn builtin(system: &SystemInfo, config: &InstallerConfig) -> Self {
        let mut tools = vec![python::python3(system)];
        tools.extend(dev_tools(system));
        tools.push(python::pip(system));
        tools.push(python::virtualenv(system));
        tools.extend(report_dependencies(config));
        tools.extend(security_tools(system, config));
        tools.extend(python_tools(config));
        Self { tools }
    }

    /// A catalog of caller-supplied tools.
    pub fn from_tools(tools: Vec<Tool>) -> Self {
        Self { tools }
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Tools in `category`, in catalog order.
    pub fn category(&self, category: Category) -> Vec<&Tool> {
        self.tools.iter().filter(|t| t.category == category).collect()
    }

    /// Look up several tools by name, skipping unknown names.
    pub fn named(&self, names: &[&str]) -> Vec<&Tool> {
        names.iter().filter_map(|name| self.get(name)).collect()
    }
}
