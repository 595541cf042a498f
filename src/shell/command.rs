//! External command execution.
//!
//! Every process the installer launches goes through a [`ProcessRunner`].
//! [`SystemRunner`] spawns real children with captured output, an enforced
//! timeout and Ctrl-C cancellation; [`FakeRunner`](super::fake::FakeRunner)
//! scripts the host in tests.

use super::interrupt::InterruptFlag;
use super::platform::{augment_path, find_program, is_elevated, join_path, parse_system_path};
use crate::error::{ResolverError, Result};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default timeout for commands that don't set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// How often a waiting runner checks the child, the timeout and Ctrl-C.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// How long the process group gets between SIGTERM and SIGKILL.
const TERM_GRACE: Duration = Duration::from_millis(200);

/// A command to execute, as an argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program followed by its arguments.
    pub argv: Vec<String>,

    /// Prefix with `sudo` unless already root.
    pub requires_sudo: bool,

    /// Kill the child once this elapses.
    pub timeout: Duration,

    /// Working directory.
    pub working_dir: Option<PathBuf>,

    /// Extra environment variables (merged with the inherited environment).
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            requires_sudo: false,
            timeout: DEFAULT_TIMEOUT,
            working_dir: None,
            env: Vec::new(),
        }
    }

    /// Run `script` through `sh -c`.
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new(["sh".to_string(), "-c".to_string(), script.into()])
    }

    pub fn sudo(mut self) -> Self {
        self.requires_sudo = true;
        self
    }

    pub fn sudo_if(mut self, requires_sudo: bool) -> Self {
        self.requires_sudo = requires_sudo;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// The program name (first argv element).
    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or("")
    }

    /// The command line as a single string for logs and errors.
    pub fn display(&self) -> String {
        let line = self.argv.join(" ");
        if self.requires_sudo {
            format!("sudo {line}")
        } else {
            line
        }
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    pub stdout: String,

    pub stderr: String,

    pub duration: Duration,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Executes external commands.
pub trait ProcessRunner {
    /// Run a command to completion.
    ///
    /// A non-zero exit is not an error here; callers inspect
    /// [`CommandOutput::exit_code`]. Errors are reserved for commands that
    /// could not be started or did not finish.
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;

    /// Run a command and treat a non-zero exit as an error.
    fn run_checked(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let output = self.run(spec)?;
        if output.success() {
            return Ok(output);
        }
        if is_permission_failure(&output.stderr) {
            return Err(ResolverError::PermissionDenied {
                message: last_line(&output.stderr)
                    .unwrap_or_else(|| spec.display()),
            });
        }
        Err(ResolverError::CommandFailed {
            command: spec.display(),
            code: output.exit_code,
        })
    }
}

/// Whether stderr reports an OS or sudo permission refusal.
pub fn is_permission_failure(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("permission denied") || lower.contains("a password is required")
}

fn last_line(text: &str) -> Option<String> {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// Runs commands on the local host.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    path: Vec<PathBuf>,
    elevated: bool,
    interrupt: InterruptFlag,
}

impl SystemRunner {
    /// Create a runner whose children see `extra_path` ahead of the
    /// inherited PATH.
    pub fn new(extra_path: &[PathBuf], interrupt: InterruptFlag) -> Self {
        Self {
            path: augment_path(extra_path, &parse_system_path()),
            elevated: is_elevated(),
            interrupt,
        }
    }

    /// The PATH used for lookups and handed to children.
    pub fn search_path(&self) -> &[PathBuf] {
        &self.path
    }

    fn build_command(&self, spec: &CommandSpec) -> Result<Command> {
        let program = spec.program();
        let resolved = find_program(program, &self.path).ok_or_else(|| {
            ResolverError::CommandNotFound {
                program: program.to_string(),
            }
        })?;

        let mut cmd = if spec.requires_sudo && !self.elevated {
            let sudo = find_program("sudo", &self.path).ok_or_else(|| {
                ResolverError::CommandNotFound {
                    program: "sudo".to_string(),
                }
            })?;
            let mut cmd = Command::new(sudo);
            // sudo resets PATH, so pass the resolved program path.
            cmd.arg(resolved);
            cmd
        } else {
            Command::new(resolved)
        };
        cmd.args(&spec.argv[1..]);
        cmd.env("PATH", join_path(&self.path));
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }
        if let Some(dir) = &spec.working_dir {
            cmd.current_dir(dir);
        }
        // stdin stays inherited so sudo can prompt for a password.
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        // Own process group, so a timeout reaches sudo's child and anything
        // the command backgrounds.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        Ok(cmd)
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.interrupt.check()?;
        let mut cmd = self.build_command(spec)?;
        debug!(command = %spec.display(), timeout = ?spec.timeout, "spawning");

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ResolverError::CommandNotFound {
                program: spec.program().to_string(),
            },
            std::io::ErrorKind::PermissionDenied => ResolverError::PermissionDenied {
                message: format!("{}: {e}", spec.program()),
            },
            _ => ResolverError::Io(e),
        })?;

        let stdout = capture(child.stdout.take());
        let stderr = capture(child.stderr.take());
        let deadline = start.checked_add(spec.timeout);

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if self.interrupt.is_set() {
                terminate(&mut child);
                debug!(command = %spec.display(), "killed after interrupt");
                return Err(ResolverError::Interrupted);
            }
            if expired(deadline) {
                terminate(&mut child);
                debug!(command = %spec.display(), "killed after timeout");
                return Err(self.timed_out(spec));
            }
            thread::sleep(POLL_INTERVAL);
        };

        // Background descendants may still hold the pipes after the direct
        // child exits; they get the rest of the timeout, then the group is
        // killed.
        let out = self.drain(&stdout, deadline);
        let err = self.drain(&stderr, deadline);
        let (Some(out), Some(err)) = (out, err) else {
            debug!(command = %spec.display(), "pipes held open after exit, killing group");
            kill_group(&child);
            if self.interrupt.is_set() {
                return Err(ResolverError::Interrupted);
            }
            return Err(self.timed_out(spec));
        };

        let output = CommandOutput {
            exit_code: status.code(),
            stdout: out,
            stderr: err,
            duration: start.elapsed(),
        };
        debug!(
            command = %spec.display(),
            exit_code = ?output.exit_code,
            elapsed_ms = output.duration.as_millis() as u64,
            "finished"
        );
        if !output.stderr.trim().is_empty() {
            debug!(stderr = %output.stderr.trim_end(), "captured stderr");
        }
        Ok(output)
    }
}

impl SystemRunner {
    /// Wait for a pipe's reader until `deadline`. `None` when the pipe is
    /// still open at the deadline or Ctrl-C arrives first.
    fn drain(&self, rx: &Receiver<String>, deadline: Option<Instant>) -> Option<String> {
        loop {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(text) => return Some(text),
                Err(RecvTimeoutError::Disconnected) => return Some(String::new()),
                Err(RecvTimeoutError::Timeout) => {
                    if self.interrupt.is_set() || expired(deadline) {
                        return None;
                    }
                }
            }
        }
    }

    fn timed_out(&self, spec: &CommandSpec) -> ResolverError {
        ResolverError::CommandTimedOut {
            command: spec.display(),
            timeout: spec.timeout,
        }
    }
}

fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|deadline| Instant::now() >= deadline)
}

/// Drain a child pipe on a background thread so the child never blocks on
/// a full pipe buffer. A reader stuck on a pipe held by an escaped daemon
/// is abandoned by the runner.
fn capture<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// SIGTERM the child's process group, then SIGKILL whatever is left.
///
/// sudo relays SIGTERM to the command it runs, which a SIGKILL to sudo
/// itself would not.
#[cfg(unix)]
fn kill_group(child: &Child) {
    let Ok(pgid) = libc::pid_t::try_from(child.id()) else {
        return;
    };
    // SAFETY: killpg only sends a signal; the group id is the child's pid,
    // set by process_group(0) at spawn.
    unsafe {
        libc::killpg(pgid, libc::SIGTERM);
    }
    thread::sleep(TERM_GRACE);
    // SAFETY: as above.
    unsafe {
        libc::killpg(pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

fn terminate(child: &mut Child) {
    kill_group(child);
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn runner() -> SystemRunner {
        SystemRunner::new(&[], InterruptFlag::detached())
    }

    #[test]
    fn run_captures_stdout() {
        let output = runner().run(&CommandSpec::new(["echo", "hello"])).unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[test]
    fn run_reports_non_zero_without_error() {
        let output = runner().run(&CommandSpec::shell("exit 3")).unwrap();
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success());
    }

    #[test]
    fn run_checked_turns_exit_into_command_failed() {
        let err = runner().run_checked(&CommandSpec::shell("exit 2")).unwrap_err();
        match err {
            ResolverError::CommandFailed { code, .. } => assert_eq!(code, Some(2)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn run_checked_classifies_permission_message() {
        let spec = CommandSpec::shell("echo 'open: Permission denied' >&2; exit 1");
        let err = runner().run_checked(&spec).unwrap_err();
        assert!(matches!(err, ResolverError::PermissionDenied { .. }));
    }

    #[test]
    fn missing_program_is_command_not_found() {
        let err = runner()
            .run(&CommandSpec::new(["definitely-not-a-real-program-42"]))
            .unwrap_err();
        assert!(matches!(err, ResolverError::CommandNotFound { .. }));
    }

    #[test]
    fn timeout_kills_child() {
        let spec = CommandSpec::new(["sleep", "5"]).timeout(Duration::from_millis(100));
        let start = Instant::now();
        let err = runner().run(&spec).unwrap_err();
        assert!(matches!(err, ResolverError::CommandTimedOut { .. }));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn background_grandchild_does_not_outlive_the_timeout() {
        let spec = CommandSpec::shell("sleep 6 & exit 0").timeout(Duration::from_secs(1));
        let start = Instant::now();
        let result = runner().run(&spec);
        assert!(
            start.elapsed() < Duration::from_secs(4),
            "run blocked for {:?}",
            start.elapsed()
        );
        assert!(matches!(result, Err(ResolverError::CommandTimedOut { .. })));
    }

    #[test]
    fn quick_background_job_still_succeeds() {
        let spec = CommandSpec::shell("(sleep 0.2; echo late) & echo early")
            .timeout(Duration::from_secs(5));
        let output = runner().run(&spec).unwrap();
        assert!(output.success());
        assert!(output.stdout.contains("early"));
        assert!(output.stdout.contains("late"));
    }

    #[test]
    fn timeout_kills_the_whole_process_group() {
        let temp = tempfile::TempDir::new().unwrap();
        let pid_file = temp.path().join("pid");
        let script = format!("sleep 30 & echo $! > {}; wait", pid_file.display());
        let spec = CommandSpec::shell(script).timeout(Duration::from_millis(500));

        let err = runner().run(&spec).unwrap_err();
        assert!(matches!(err, ResolverError::CommandTimedOut { .. }));

        let pid: libc::pid_t = std::fs::read_to_string(&pid_file)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        let gone = (0..40).any(|_| {
            // SAFETY: signal 0 only checks that the pid exists.
            let exists = unsafe { libc::kill(pid, 0) } == 0;
            // An unreaped zombie is dead too.
            let zombie = std::fs::read_to_string(format!("/proc/{pid}/stat"))
                .is_ok_and(|stat| stat.contains(") Z "));
            let alive = exists && !zombie;
            if alive {
                std::thread::sleep(Duration::from_millis(50));
            }
            !alive
        });
        assert!(gone, "background sleep {pid} survived the timeout");
    }

    #[test]
    fn raised_interrupt_stops_before_spawn() {
        let flag = InterruptFlag::detached();
        flag.raise();
        let runner = SystemRunner::new(&[], flag);
        let err = runner.run(&CommandSpec::new(["echo", "x"])).unwrap_err();
        assert!(matches!(err, ResolverError::Interrupted));
    }

    #[test]
    fn env_and_working_dir_are_applied() {
        let temp = tempfile::TempDir::new().unwrap();
        let spec = CommandSpec::shell("echo \"$RECON_VAR\"; pwd")
            .env("RECON_VAR", "value")
            .in_dir(temp.path());
        let output = runner().run(&spec).unwrap();
        assert!(output.stdout.contains("value"));
        let canonical = temp.path().canonicalize().unwrap();
        assert!(output.stdout.contains(canonical.to_str().unwrap()));
    }

    #[test]
    fn extra_path_is_searched_first() {
        let temp = tempfile::TempDir::new().unwrap();
        let bin = temp.path().join("recon-probe-tool");
        std::fs::write(&bin, "#!/bin/sh\necho from-extra\n").unwrap();
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();

        let runner = SystemRunner::new(&[temp.path().to_path_buf()], InterruptFlag::detached());
        let output = runner.run(&CommandSpec::new(["recon-probe-tool"])).unwrap();
        assert_eq!(output.stdout.trim(), "from-extra");
    }

    #[test]
    fn display_includes_sudo_prefix() {
        let spec = CommandSpec::new(["apt-get", "update"]).sudo();
        assert_eq!(spec.display(), "sudo apt-get update");
        assert_eq!(spec.program(), "apt-get");
    }
}
