//! Helpers for running child processes with timeouts and bounded output.

use std::io::{Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Run a command with a timeout and capture stdout/stderr without risking pipe deadlocks.
///
/// Output is read concurrently while the child runs. `output_limit_bytes` bounds the amount of
/// stdout/stderr stored in memory (bytes beyond this are discarded while still draining the pipe).
#[instrument(skip_all, fields(timeout_ms = timeout.as_millis() as u64, output_limit_bytes))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    stdin: Option<&[u8]>,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    if stdin.is_some() {
        cmd.stdin(Stdio::piped());
    } else {
        cmd.stdin(Stdio::null());
    }
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_handle = thread::spawn(move || read_stream_limited(stdout, output_limit_bytes));
    let stderr_handle = thread::spawn(move || read_stream_limited(stderr, output_limit_bytes));

    if let Some(input) = stdin {
        let mut child_stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("stdin was not piped"))?;
        // A child that exits without reading stdin closes the pipe early.
        if let Err(e) = child_stdin.write_all(input) {
            debug!(err = %e, "child closed stdin early");
        }
    }

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(
                timeout_ms = timeout.as_millis() as u64,
                "command timed out, killing"
            );
            timed_out = true;
            child.kill().context("kill command")?;
            child.wait().context("wait command after kill")?
        }
    };

    let (stdout, stdout_truncated) = join_output(stdout_handle).context("join stdout")?;
    let (stderr, stderr_truncated) = join_output(stderr_handle).context("join stderr")?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
    })
}

fn join_output(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[test]
    fn captures_stdout_and_stdin() {
        let output = run_command_with_timeout(
            sh("cat; printf ' done' 1>&2"),
            Some(b"hello"),
            Duration::from_secs(5),
            1024,
        )
        .expect("run");
        assert!(output.status.success());
        assert!(!output.timed_out);
        assert_eq!(output.stdout_lossy(), "hello");
        assert_eq!(output.stderr_lossy(), " done");
    }

    #[test]
    fn truncates_output_beyond_limit() {
        let output = run_command_with_timeout(
            sh("printf 'abcdef'"),
            None,
            Duration::from_secs(5),
            4,
        )
        .expect("run");
        assert_eq!(output.stdout, b"abcd");
        assert_eq!(output.stdout_truncated, 2);
    }

    #[test]
    fn kills_command_after_timeout() {
        let output = run_command_with_timeout(
            sh("exec sleep 5"),
            None,
            Duration::from_millis(200),
            1024,
        )
        .expect("run");
        assert!(output.timed_out);
        assert!(!output.status.success());
    }

    #[test]
    fn spawn_failure_is_an_error() {
        let err = run_command_with_timeout(
            Command::new("definitely-not-a-real-binary-xyz"),
            None,
            Duration::from_secs(1),
            1024,
        )
        .expect_err("spawn fails");
        assert!(err.to_string().contains("spawn command"));
    }
}
