//! Per-assertion and per-record verdicts accumulated during validation.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;

use super::record::Level;

/// Why a single assertion failed.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureCause {
    /// The solution returned a value different from `expected`.
    Mismatch,
    /// The returned value does not have the declared output type.
    TypeMismatch(String),
    /// The solution raised while running.
    Raised(String),
    /// The invocation exceeded the wall-clock limit.
    TimedOut(Duration),
    /// The solution text could not be bound to a callable.
    Unbindable(String),
}

impl FailureCause {
    pub fn label(&self) -> &'static str {
        match self {
            FailureCause::Mismatch => "assertion failure",
            FailureCause::TypeMismatch(_) => "type mismatch",
            FailureCause::Raised(_) => "invocation error",
            FailureCause::TimedOut(_) => "timeout",
            FailureCause::Unbindable(_) => "invocation error",
        }
    }

    pub fn detail(&self) -> Option<String> {
        match self {
            FailureCause::Mismatch => None,
            FailureCause::TypeMismatch(detail)
            | FailureCause::Raised(detail)
            | FailureCause::Unbindable(detail) => Some(detail.clone()),
            FailureCause::TimedOut(limit) => Some(format!("exceeded {}s", limit.as_secs_f64())),
        }
    }
}

/// A failing assertion with everything an author needs to fix it.
#[derive(Debug, Clone, PartialEq)]
pub struct AssertionFailure {
    /// 1-based position in the record's `asserts`.
    pub index: usize,
    pub arguments: Vec<Value>,
    pub expected: Value,
    /// Returned value, when the solution returned at all.
    pub actual: Option<Value>,
    pub cause: FailureCause,
    /// Path-level differences between actual and expected.
    pub differences: Vec<String>,
}

/// Verdict for one record after every assertion ran.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordVerdict {
    pub name: String,
    pub level: Level,
    /// Source location, relative to the content root.
    pub path: PathBuf,
    pub total: usize,
    pub failures: Vec<AssertionFailure>,
}

impl RecordVerdict {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn passed_count(&self) -> usize {
        self.total - self.failures.len()
    }
}

/// Outcome of validating a full record set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub verdicts: Vec<RecordVerdict>,
    /// Lint warnings, prefixed with the record path.
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn all_passed(&self) -> bool {
        self.verdicts.iter().all(RecordVerdict::passed)
    }

    pub fn total_asserts(&self) -> usize {
        self.verdicts.iter().map(|verdict| verdict.total).sum()
    }

    pub fn failed_asserts(&self) -> usize {
        self.verdicts.iter().map(|verdict| verdict.failures.len()).sum()
    }

    pub fn failed_records(&self) -> impl Iterator<Item = &RecordVerdict> {
        self.verdicts.iter().filter(|verdict| !verdict.passed())
    }
}
