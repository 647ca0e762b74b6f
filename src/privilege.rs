// Privileged command execution
//
// The workflow never shells out directly; everything goes through a
// CommandRunner so platform backends can be exercised with a scripted fake.
// The real runner enforces a bounded timeout on every invocation: a hung OS
// command must not hang the workflow.

use crate::error::ShareError;
use std::io::Read;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Diagnostic text for error reporting: stderr if present, else stdout.
    pub fn diagnostic(&self) -> String {
        let err = self.stderr.trim();
        if err.is_empty() {
            self.stdout.trim().to_string()
        } else {
            err.to_string()
        }
    }
}

/// External collaborator contract for running OS commands, optionally with
/// administrator/root privileges. A refused or dismissed elevation surfaces
/// as `ShareError::Cancelled`, which the orchestrator treats as "return to
/// the previous stable state", never as a failure.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, ShareError>;
    fn run_elevated(&self, program: &str, args: &[&str]) -> Result<CommandOutput, ShareError>;
}

/// Renders an argv for error messages and logs.
pub fn render_command(program: &str, args: &[&str]) -> String {
    let mut s = String::from(program);
    for a in args {
        s.push(' ');
        s.push_str(a);
    }
    s
}

/// Real runner on top of std::process. Elevation uses non-interactive sudo on
/// Unix (the tool is expected to run under sudo or with a NOPASSWD rule); on
/// Windows the process itself must already be elevated, so commands run
/// directly and access-denied output is mapped by the backend.
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn run_with_timeout(&self, program: &str, args: &[&str]) -> Result<CommandOutput, ShareError> {
        let rendered = render_command(program, args);
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ShareError::CommandNotFound(program.to_string())
                } else {
                    ShareError::failed(&rendered, e.to_string())
                }
            })?;

        // Drain pipes on side threads so a chatty command cannot deadlock
        // against a full pipe buffer while we poll for exit.
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let stdout_handle = std::thread::spawn(move || read_pipe(stdout_pipe));
        let stderr_handle = std::thread::spawn(move || read_pipe(stderr_pipe));

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(ShareError::Timeout {
                            command: rendered,
                            secs: self.timeout.as_secs(),
                        });
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
                Err(e) => return Err(ShareError::failed(&rendered, e.to_string())),
            }
        };

        let stdout = stdout_handle.join().unwrap_or_default();
        let stderr = stderr_handle.join().unwrap_or_default();
        Ok(CommandOutput {
            code: status.code().unwrap_or(-1),
            stdout,
            stderr,
        })
    }
}

fn read_pipe(pipe: Option<impl Read>) -> String {
    let mut buf = String::new();
    if let Some(mut r) = pipe {
        let _ = r.read_to_string(&mut buf);
    }
    buf
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, ShareError> {
        self.run_with_timeout(program, args)
    }

    fn run_elevated(&self, program: &str, args: &[&str]) -> Result<CommandOutput, ShareError> {
        if cfg!(windows) {
            return self.run_with_timeout(program, args);
        }
        let mut sudo_args: Vec<&str> = vec!["-n", program];
        sudo_args.extend_from_slice(args);
        let output = self.run_with_timeout("sudo", &sudo_args)?;
        if !output.success() && is_elevation_refused(&output.stderr) {
            return Err(ShareError::Cancelled);
        }
        Ok(output)
    }
}

/// sudo -n cannot prompt; its refusal is the non-interactive equivalent of a
/// dismissed credentials dialog.
fn is_elevation_refused(stderr: &str) -> bool {
    let lowered = stderr.to_lowercase();
    lowered.contains("password is required")
        || lowered.contains("incorrect password")
        || lowered.contains("authentication failure")
}
