//! Process runner: executes one step's shell invocation and captures its
//! output.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{BenchError, Result};
use crate::translate::Step;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Lines of merged output kept as the failure message when stderr is empty.
const FAILURE_TAIL_LINES: usize = 20;

/// Executes steps. The orchestrator only talks to this seam, which lets tests
/// script the external tools.
pub trait StepRunner {
    /// Run `step` to completion and return its standard output.
    ///
    /// Fails with `Timeout` once `timeout` has elapsed and with
    /// `ProcessFailure` on a non-zero exit.
    fn run(&self, step: &Step, timeout: Option<Duration>) -> Result<String>;
}

/// Runs invocations through `sh -c`.
pub struct ShellRunner {
    shell: String,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self::with_shell("sh")
    }

    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    fn spawn(&self, invocation: &str) -> Result<Child> {
        let mut command = Command::new(&self.shell);
        command
            .arg("-c")
            .arg(invocation)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Own process group, so a timeout can take down the whole pipeline.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        Ok(command.spawn()?)
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl StepRunner for ShellRunner {
    fn run(&self, step: &Step, timeout: Option<Duration>) -> Result<String> {
        log::debug!("$ {}", step.invocation);
        let mut child = self.spawn(&step.invocation)?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match timeout {
            None => child.wait()?,
            Some(limit) => match wait_until(&mut child, limit)? {
                Some(status) => status,
                None => {
                    terminate(&mut child);
                    // Readers are left detached: orphaned grandchildren may
                    // still hold the pipes open.
                    return Err(BenchError::Timeout {
                        step: step.kind.name().to_string(),
                        after: limit,
                    });
                }
            },
        };

        let stdout = collect(stdout);
        let stderr = collect(stderr);
        if !stderr.trim().is_empty() {
            log::debug!("{} stderr: {}", step.kind, stderr.trim());
        }

        if !status.success() {
            // Load-generator steps redirect `2>&1`, so their diagnostics
            // arrive on stdout.
            let stderr = if stderr.trim().is_empty() {
                tail_lines(&stdout, FAILURE_TAIL_LINES)
            } else {
                stderr
            };
            return Err(BenchError::ProcessFailure {
                exit_code: status.code(),
                stderr,
            });
        }
        Ok(stdout)
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(err) = pipe.read_to_end(&mut buf) {
            log::warn!("Failed to read process output: {err}");
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.trim_end().lines().collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}

/// Wait for the child to exit; `None` if `limit` passes first.
fn wait_until(child: &mut Child, limit: Duration) -> Result<Option<ExitStatus>> {
    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        match i32::try_from(child.id()) {
            Ok(pgid) => {
                if let Err(err) = killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
                    log::warn!("Failed to kill process group {pgid}: {err}, killing the shell only");
                }
            }
            Err(_) => log::warn!("Process id {} out of range, killing the shell only", child.id()),
        }
    }
    if let Err(err) = child.kill() {
        log::debug!("kill: {err}");
    }
    if let Err(err) = child.wait() {
        log::warn!("Failed to reap timed-out process {}: {err}", child.id());
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::translate::StepKind;

    fn step(invocation: &str) -> Step {
        Step {
            kind: StepKind::Populate,
            description: "test".to_string(),
            invocation: invocation.to_string(),
        }
    }

    #[test]
    fn captures_stdout() {
        let out = ShellRunner::new()
            .run(&step("printf 'a\\nb\\n'"), None)
            .unwrap();
        assert_eq!(out, "a\nb\n");
    }

    #[test]
    fn merged_stderr_lands_in_stdout() {
        let out = ShellRunner::new()
            .run(&step("(echo out; echo err >&2) 2>&1"), Some(Duration::from_secs(10)))
            .unwrap();
        assert!(out.contains("out"));
        assert!(out.contains("err"));
    }

    #[test]
    fn nonzero_exit_is_process_failure() {
        let err = ShellRunner::new()
            .run(&step("echo broken >&2; exit 3"), None)
            .unwrap_err();
        match err {
            BenchError::ProcessFailure { exit_code, stderr } => {
                assert_eq!(exit_code, Some(3));
                assert_eq!(stderr.trim(), "broken");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn failure_message_falls_back_to_merged_output() {
        let err = ShellRunner::new()
            .run(&step("(echo 'Connection refused' >&2; exit 1) 2>&1"), None)
            .unwrap_err();
        match err {
            BenchError::ProcessFailure { exit_code, stderr } => {
                assert_eq!(exit_code, Some(1));
                assert!(stderr.contains("Connection refused"), "{stderr:?}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn failure_message_keeps_only_the_tail() {
        let err = ShellRunner::new()
            .run(&step("seq 1 100; exit 2"), None)
            .unwrap_err();
        match err {
            BenchError::ProcessFailure { stderr, .. } => {
                let lines: Vec<&str> = stderr.lines().collect();
                assert_eq!(lines.len(), FAILURE_TAIL_LINES);
                assert_eq!(lines.first(), Some(&"81"));
                assert_eq!(lines.last(), Some(&"100"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn timed_out_pipeline_is_killed_as_a_group() {
        let started = Instant::now();
        let err = ShellRunner::new()
            .run(&step("sleep 5 | sleep 5"), Some(Duration::from_millis(200)))
            .unwrap_err();
        assert!(matches!(err, BenchError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn slow_step_times_out() {
        let started = Instant::now();
        let err = ShellRunner::new()
            .run(&step("sleep 5"), Some(Duration::from_millis(200)))
            .unwrap_err();
        assert!(matches!(err, BenchError::Timeout { ref step, .. } if step == "populate"));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn missing_shell_is_io_error() {
        let err = ShellRunner::with_shell("/nonexistent/shell")
            .run(&step("true"), None)
            .unwrap_err();
        assert!(matches!(err, BenchError::Io(_)));
    }
}
