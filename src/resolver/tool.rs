//! Tool definitions.

use super::method::{InstallationMethod, NativeStep};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Grouping used for sub-aggregate ratios and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Prerequisite,
    ReportDependency,
    Security,
    Python,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Prerequisite => "prerequisite",
            Self::ReportDependency => "report dependency",
            Self::Security => "security tool",
            Self::Python => "python tool",
        })
    }
}

/// A tool to make available, with ordered ways of installing it.
///
/// Built once from the catalog and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub category: Category,
    /// Command whose zero exit means the tool is usable.
    pub check_invocation: Vec<String>,
    pub primary_methods: Vec<InstallationMethod>,
    pub alternative_methods: Vec<InstallationMethod>,
    /// Run once after a method-driven success; failures are ignored.
    pub post_install_hooks: Vec<NativeStep>,
}

impl Tool {
    /// A tool checked with `<name> --version`.
    pub fn new(name: impl Into<String>, description: impl Into<String>, category: Category) -> Self {
        let name = name.into();
        Self {
            check_invocation: vec![name.clone(), "--version".to_string()],
            name,
            description: description.into(),
            category,
            primary_methods: Vec::new(),
            alternative_methods: Vec::new(),
            post_install_hooks: Vec::new(),
        }
    }

    pub fn check<I, S>(mut self, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.check_invocation = argv.into_iter().map(Into::into).collect();
        self
    }

    pub fn primary(mut self, method: InstallationMethod) -> Self {
        self.primary_methods.push(method);
        self
    }

    pub fn primaries(mut self, methods: impl IntoIterator<Item = InstallationMethod>) -> Self {
        self.primary_methods.extend(methods);
        self
    }

    pub fn alternative(mut self, method: InstallationMethod) -> Self {
        self.alternative_methods.push(method);
        self
    }

    pub fn alternatives(mut self, methods: impl IntoIterator<Item = InstallationMethod>) -> Self {
        self.alternative_methods.extend(methods);
        self
    }

    pub fn hook(mut self, step: NativeStep) -> Self {
        self.post_install_hooks.push(step);
        self
    }

    /// Total number of methods across both tiers.
    pub fn method_count(&self) -> usize {
        self.primary_methods.len() + self.alternative_methods.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::CommandSpec;

    #[test]
    fn new_tool_checks_version_flag() {
        let tool = Tool::new("nmap", "Network Mapper", Category::Security);
        assert_eq!(tool.check_invocation, vec!["nmap", "--version"]);
        assert_eq!(tool.method_count(), 0);
    }

    #[test]
    fn builder_keeps_declared_order() {
        let tool = Tool::new("httpx", "HTTP toolkit", Category::Security)
            .check(["httpx", "-version"])
            .primary(InstallationMethod::command(CommandSpec::new(["go", "install"])))
            .alternative(InstallationMethod::native("build", |_| Ok(())))
            .alternative(InstallationMethod::native("release", |_| Ok(())));

        assert_eq!(tool.check_invocation, vec!["httpx", "-version"]);
        assert_eq!(tool.method_count(), 3);
        let labels: Vec<_> = tool.alternative_methods.iter().map(|m| m.label()).collect();
        assert_eq!(labels, vec!["build", "release"]);
    }

    #[test]
    fn category_displays_lowercase() {
        assert_eq!(Category::Security.to_string(), "security tool");
    }
}
