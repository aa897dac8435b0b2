//! Embedded-script evaluator.
//!
//! The [`Evaluator`] trait isolates how reference solutions are executed from
//! the validation pipeline. [`PythonEvaluator`] runs each call in a fresh
//! interpreter process with a wall-clock limit; tests use scripted evaluators
//! that answer in-process.

use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::io::config::EvaluatorConfig;
use crate::io::process::{CommandOutput, run_command_with_timeout};

const HARNESS: &str = include_str!("harness.py");

/// Limits applied to every evaluator call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallLimits {
    /// Maximum time before the call is abandoned.
    pub timeout: Duration,
    /// Maximum bytes kept from the interpreter's stdout/stderr.
    pub output_limit_bytes: usize,
}

impl CallLimits {
    /// Default limits: 10s timeout, 1MB output.
    pub fn default_limits() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            output_limit_bytes: 1_000_000,
        }
    }
}

/// Result of checking that a solution can be called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Bound,
    /// The text does not define a callable accepting the declared arity.
    Rejected(String),
}

/// Result of one solution call.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    Returned(Value),
    /// The returned value has no JSON counterpart of its declared shape
    /// (a tuple, a set, or a hash with non-string keys).
    WrongType(String),
    Raised(String),
    TimedOut(Duration),
}

/// Abstraction over solution execution backends.
///
/// `Err` is reserved for infrastructure faults (e.g. the interpreter cannot be
/// spawned); content defects come back as [`Binding::Rejected`] or
/// [`Invocation::Raised`].
pub trait Evaluator {
    /// Check that `solution` defines a callable taking `arity` positional arguments.
    fn bind(&self, solution: &str, arity: usize, limits: CallLimits) -> Result<Binding>;

    /// Call the solution with positional `arguments`.
    fn invoke(
        &self,
        solution: &str,
        arguments: &[Value],
        limits: CallLimits,
    ) -> Result<Invocation>;
}

#[derive(Debug, Serialize)]
struct HarnessRequest<'a> {
    solution: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    arguments: Option<&'a [Value]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    arity: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum HarnessResponse {
    Bound(IgnoredAny),
    BindError(String),
    TypeError(String),
    Raised(String),
    Returned(Value),
}

/// Evaluator that runs solutions with a Python interpreter.
#[derive(Debug, Clone)]
pub struct PythonEvaluator {
    program: String,
    args: Vec<String>,
}

impl PythonEvaluator {
    pub fn new(config: &EvaluatorConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(HARNESS);
        cmd
    }

    fn call(&self, request: &HarnessRequest<'_>, limits: CallLimits) -> Result<Reply> {
        let payload = serde_json::to_vec(request).context("serialize harness request")?;
        let output = run_command_with_timeout(
            self.command(),
            Some(&payload),
            limits.timeout,
            limits.output_limit_bytes,
        )
        .with_context(|| format!("run interpreter {}", self.program))?;
        Ok(parse_reply(&output, limits.timeout))
    }
}

enum Reply {
    Response(HarnessResponse),
    TimedOut(Duration),
    Broken(String),
}

fn parse_reply(output: &CommandOutput, timeout: Duration) -> Reply {
    if output.timed_out {
        return Reply::TimedOut(timeout);
    }
    if !output.status.success() {
        let stderr = output.stderr_lossy();
        warn!(exit_code = ?output.status.code(), "interpreter exited abnormally");
        return Reply::Broken(format!(
            "interpreter exited with status {:?}: {}",
            output.status.code(),
            last_line(&stderr)
        ));
    }
    if output.stdout_truncated > 0 {
        return Reply::Broken(format!(
            "interpreter output exceeded {} bytes",
            output.stdout.len()
        ));
    }
    match serde_json::from_slice::<HarnessResponse>(&output.stdout) {
        Ok(response) => Reply::Response(response),
        Err(err) => Reply::Broken(format!("unreadable interpreter response: {err}")),
    }
}

fn last_line(text: &str) -> &str {
    text.lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("")
        .trim()
}

impl Evaluator for PythonEvaluator {
    #[instrument(skip_all, fields(arity = arity))]
    fn bind(&self, solution: &str, arity: usize, limits: CallLimits) -> Result<Binding> {
        let request = HarnessRequest {
            solution,
            arguments: None,
            arity: Some(arity),
        };
        let binding = match self.call(&request, limits)? {
            Reply::Response(HarnessResponse::Bound(_)) => Binding::Bound,
            Reply::Response(HarnessResponse::BindError(reason)) => Binding::Rejected(reason),
            Reply::Response(other) => {
                Binding::Rejected(format!("unexpected interpreter response {other:?}"))
            }
            Reply::TimedOut(limit) => Binding::Rejected(format!(
                "loading the solution exceeded {}s",
                limit.as_secs_f64()
            )),
            Reply::Broken(reason) => Binding::Rejected(reason),
        };
        debug!(?binding, "bind finished");
        Ok(binding)
    }

    #[instrument(skip_all, fields(argument_count = arguments.len()))]
    fn invoke(
        &self,
        solution: &str,
        arguments: &[Value],
        limits: CallLimits,
    ) -> Result<Invocation> {
        let request = HarnessRequest {
            solution,
            arguments: Some(arguments),
            arity: None,
        };
        let invocation = match self.call(&request, limits)? {
            Reply::Response(HarnessResponse::Returned(value)) => Invocation::Returned(value),
            Reply::Response(HarnessResponse::TypeError(detail)) => Invocation::WrongType(detail),
            Reply::Response(HarnessResponse::Raised(message)) => Invocation::Raised(message),
            Reply::Response(HarnessResponse::BindError(reason)) => Invocation::Raised(reason),
            Reply::Response(HarnessResponse::Bound(_)) => {
                Invocation::Raised("interpreter did not call the solution".to_string())
            }
            Reply::TimedOut(limit) => Invocation::TimedOut(limit),
            Reply::Broken(reason) => Invocation::Raised(reason),
        };
        Ok(invocation)
    }
}
