//! Local `sh -c` execution with an optional timeout.
//!
//! stdout and stderr are drained on dedicated threads so a chatty command
//! cannot fill a pipe and deadlock; the wait happens on a third thread so a
//! timeout can be enforced with `recv_timeout` instead of polling.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Exit code reported when a command is killed for running too long.
pub const TIMEOUT_EXIT_CODE: i32 = 124;
/// Exit code reported when the shell could not be spawned at all.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;

const MAX_OUTPUT: usize = 10 * 1024;

/// Resolve `sh` on PATH.
pub fn find_shell() -> Option<PathBuf> {
    which::which("sh").ok()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShellOutput {
    pub code: i32,
    pub timed_out: bool,
    /// Combined stdout/stderr, trimmed and capped to the last 10KB.
    pub output: String,
    pub elapsed: Duration,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.code == 0 && !self.timed_out
    }
}

#[derive(Debug, Clone)]
pub struct ShellCommand {
    shell: PathBuf,
    command: String,
    cwd: PathBuf,
    env: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl ShellCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            shell: PathBuf::from("sh"),
            command: command.into(),
            cwd: PathBuf::from("."),
            env: Vec::new(),
            timeout: None,
        }
    }

    /// Interpreter invoked as `<shell> -c <command>`. Defaults to `sh`.
    pub fn shell(mut self, shell: &Path) -> Self {
        self.shell = shell.to_path_buf();
        self
    }

    pub fn current_dir(mut self, cwd: &Path) -> Self {
        self.cwd = cwd.to_path_buf();
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// `None` waits indefinitely.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn run(&self) -> ShellOutput {
        let start = Instant::now();
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(&self.command)
            .current_dir(&self.cwd)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Own process group, so a timeout can take down background jobs too.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                return ShellOutput {
                    code: SPAWN_FAILURE_EXIT_CODE,
                    timed_out: false,
                    output: format!("failed to spawn: {e}"),
                    elapsed: start.elapsed(),
                }
            }
        };

        let child_pid = child.id();
        let stdout_thread = drain(child.stdout.take());
        let stderr_thread = drain(child.stderr.take());

        let wait_result = match self.timeout {
            None => child.wait(),
            Some(limit) => {
                let (tx, rx) = std::sync::mpsc::channel();
                std::thread::spawn(move || {
                    let _ = tx.send(child.wait());
                });
                match rx.recv_timeout(limit) {
                    Ok(result) => result,
                    Err(_) => {
                        // The reader threads are not joined: a process that
                        // escaped the group may still hold the pipes.
                        kill_process_group(child_pid);
                        return ShellOutput {
                            code: TIMEOUT_EXIT_CODE,
                            timed_out: true,
                            output: format!("timed out after {}s", limit.as_secs()),
                            elapsed: start.elapsed(),
                        };
                    }
                }
            }
        };

        let stdout_buf = stdout_thread.join().unwrap_or_default();
        let stderr_buf = stderr_thread.join().unwrap_or_default();
        let output = combine(&stdout_buf, &stderr_buf);

        let code = match wait_result {
            // Killed by a signal has no code.
            Ok(status) => status.code().unwrap_or(1),
            Err(e) => {
                return ShellOutput {
                    code: 1,
                    timed_out: false,
                    output: format!("wait failed: {e}"),
                    elapsed: start.elapsed(),
                }
            }
        };

        ShellOutput {
            code,
            timed_out: false,
            output,
            elapsed: start.elapsed(),
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut r) = pipe {
            let _ = r.read_to_string(&mut buf);
        }
        buf
    })
}

/// Combine stdout/stderr and cap to 10KB, keeping the tail.
fn combine(stdout: &str, stderr: &str) -> String {
    let output = if stderr.is_empty() {
        stdout.to_string()
    } else if stdout.is_empty() {
        stderr.to_string()
    } else {
        format!("{stdout}\n{stderr}")
    };
    let trimmed = output.trim();
    if trimmed.len() <= MAX_OUTPUT {
        return trimmed.to_string();
    }
    let mut cut = trimmed.len() - MAX_OUTPUT;
    while !trimmed.is_char_boundary(cut) {
        cut += 1;
    }
    trimmed[cut..].to_string()
}

/// SIGKILL the group led by `pid`. Best-effort.
fn kill_process_group(pid: u32) {
    let _ = Command::new("kill")
        .arg("-9")
        .arg("--")
        .arg(format!("-{pid}"))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}
