//! Scripted process runner for tests.
//!
//! [`FakeRunner`] answers commands from a list of rules matched on argv
//! prefixes, records every call, and can model installs: a rule created
//! with [`FakeRunner::installs`] makes a program answer with exit 0 once
//! the rule has fired successfully.

use super::command::{CommandOutput, CommandSpec, ProcessRunner};
use crate::error::{ResolverError, Result};
use std::cell::RefCell;
use std::time::Duration;

/// Scripted reply for a matching command.
#[derive(Debug, Clone)]
pub enum FakeResponse {
    /// Exit with this code and no output.
    Exit(i32),
    /// Exit with this code and output.
    Output {
        code: i32,
        stdout: String,
        stderr: String,
    },
    /// The program does not exist.
    NotFound,
    /// The command ran past its timeout.
    TimedOut,
    /// The OS refused to start the program.
    PermissionDenied,
}

#[derive(Debug, Clone)]
struct Rule {
    prefix: Vec<String>,
    response: FakeResponse,
    installs: Option<String>,
    once: bool,
}

/// A [`ProcessRunner`] that never touches the host.
///
/// Commands matching no rule fail with `CommandNotFound`. Later rules take
/// precedence over earlier ones.
#[derive(Debug, Default)]
pub struct FakeRunner {
    rules: RefCell<Vec<Rule>>,
    calls: RefCell<Vec<CommandSpec>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands starting with `prefix`.
    pub fn on(self, prefix: &[&str], response: FakeResponse) -> Self {
        self.push(prefix, response, None);
        self
    }

    /// Answer the next matching command only; the rule is then dropped.
    pub fn once(self, prefix: &[&str], response: FakeResponse) -> Self {
        self.rules.borrow_mut().push(Rule {
            prefix: prefix.iter().map(|s| s.to_string()).collect(),
            response,
            installs: None,
            once: true,
        });
        self
    }

    /// Answer commands starting with `prefix` with exit 0.
    pub fn succeeds(self, prefix: &[&str]) -> Self {
        self.on(prefix, FakeResponse::Exit(0))
    }

    /// Answer commands starting with `prefix` with `code`.
    pub fn fails(self, prefix: &[&str], code: i32) -> Self {
        self.on(prefix, FakeResponse::Exit(code))
    }

    /// Answer with stdout and exit 0.
    pub fn prints(self, prefix: &[&str], stdout: &str) -> Self {
        self.on(
            prefix,
            FakeResponse::Output {
                code: 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        )
    }

    /// Succeed on `prefix` and make `program` present from then on.
    pub fn installs(self, prefix: &[&str], program: &str) -> Self {
        self.push(prefix, FakeResponse::Exit(0), Some(program.to_string()));
        self
    }

    /// Make `program` present immediately.
    pub fn installed(self, program: &str) -> Self {
        self.succeeds(&[program])
    }

    /// Every command run so far.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }

    /// Every command run so far, as display strings.
    pub fn call_lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.argv.join(" ")).collect()
    }

    /// Whether any call started with `prefix`.
    pub fn was_called(&self, prefix: &[&str]) -> bool {
        self.calls
            .borrow()
            .iter()
            .any(|spec| matches_prefix(&spec.argv, prefix))
    }

    fn push(&self, prefix: &[&str], response: FakeResponse, installs: Option<String>) {
        self.rules.borrow_mut().push(Rule {
            prefix: prefix.iter().map(|s| s.to_string()).collect(),
            response,
            installs,
            once: false,
        });
    }
}

fn matches_prefix<S: AsRef<str>>(argv: &[String], prefix: &[S]) -> bool {
    argv.len() >= prefix.len() && argv.iter().zip(prefix).all(|(a, p)| a == p.as_ref())
}

impl ProcessRunner for FakeRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.calls.borrow_mut().push(spec.clone());

        let rule = {
            let mut rules = self.rules.borrow_mut();
            let index = rules
                .iter()
                .rposition(|rule| matches_prefix(&spec.argv, rule.prefix.as_slice()));
            match index {
                Some(i) if rules[i].once => Some(rules.remove(i)),
                Some(i) => Some(rules[i].clone()),
                None => None,
            }
        };
        let Some(rule) = rule else {
            return Err(ResolverError::CommandNotFound {
                program: spec.program().to_string(),
            });
        };

        let output = match rule.response {
            FakeResponse::Exit(code) => CommandOutput {
                exit_code: Some(code),
                ..Default::default()
            },
            FakeResponse::Output {
                code,
                stdout,
                stderr,
            } => CommandOutput {
                exit_code: Some(code),
                stdout,
                stderr,
                duration: Duration::ZERO,
            },
            FakeResponse::NotFound => {
                return Err(ResolverError::CommandNotFound {
                    program: spec.program().to_string(),
                })
            }
            FakeResponse::TimedOut => {
                return Err(ResolverError::CommandTimedOut {
                    command: spec.display(),
                    timeout: spec.timeout,
                })
            }
            FakeResponse::PermissionDenied => {
                return Err(ResolverError::PermissionDenied {
                    message: spec.display(),
                })
            }
        };

        if output.success() {
            if let Some(program) = rule.installs {
                self.push(&[program.as_str()], FakeResponse::Exit(0), None);
            }
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmatched_command_is_not_found() {
        let runner = FakeRunner::new();
        let err = runner.run(&CommandSpec::new(["nmap", "--version"])).unwrap_err();
        assert!(matches!(err, ResolverError::CommandNotFound { .. }));
        assert!(runner.was_called(&["nmap"]));
    }

    #[test]
    fn later_rules_override_earlier() {
        let runner = FakeRunner::new()
            .fails(&["apt-get"], 100)
            .succeeds(&["apt-get", "update"]);

        let update = runner.run(&CommandSpec::new(["apt-get", "update"])).unwrap();
        let install = runner
            .run(&CommandSpec::new(["apt-get", "install", "-y", "nmap"]))
            .unwrap();
        assert!(update.success());
        assert_eq!(install.exit_code, Some(100));
    }

    #[test]
    fn once_rule_fires_a_single_time() {
        let runner = FakeRunner::new()
            .succeeds(&["apt-get", "update"])
            .once(&["apt-get", "update"], FakeResponse::Exit(100));

        let spec = CommandSpec::new(["apt-get", "update"]);
        assert_eq!(runner.run(&spec).unwrap().exit_code, Some(100));
        assert!(runner.run(&spec).unwrap().success());
    }

    #[test]
    fn installs_makes_program_present() {
        let runner = FakeRunner::new().installs(&["snap", "install", "amass"], "amass");

        assert!(runner.run(&CommandSpec::new(["amass", "-version"])).is_err());
        runner
            .run(&CommandSpec::new(["snap", "install", "amass"]))
            .unwrap();
        assert!(runner
            .run(&CommandSpec::new(["amass", "-version"]))
            .unwrap()
            .success());
    }

    #[test]
    fn run_checked_uses_default_classification() {
        let runner = FakeRunner::new().on(
            &["cp"],
            FakeResponse::Output {
                code: 1,
                stdout: String::new(),
                stderr: "cp: cannot create: Permission denied\n".into(),
            },
        );
        let err = runner.run_checked(&CommandSpec::new(["cp", "a", "b"])).unwrap_err();
        assert!(matches!(err, ResolverError::PermissionDenied { .. }));
    }
}
