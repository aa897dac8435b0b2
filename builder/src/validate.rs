//! Assertion execution over a loaded record set.
//!
//! Every assertion of every record runs, even after failures, so a single run
//! reports all defects. Only infrastructure errors from the evaluator abort.

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::core::compare::{differences, values_equal};
use crate::core::lints::{LintSettings, lint_record};
use crate::core::record::{Assert, Record};
use crate::core::verdict::{AssertionFailure, FailureCause, RecordVerdict, ValidationReport};
use crate::io::evaluator::{Binding, CallLimits, Evaluator, Invocation};
use crate::io::loader::{LoadedRecord, RecordSet};

/// Lint and execute every record in `set`.
#[instrument(skip_all, fields(records = set.len()))]
pub fn validate_records(
    set: &RecordSet,
    evaluator: &dyn Evaluator,
    limits: CallLimits,
    lints: &LintSettings,
) -> Result<ValidationReport> {
    let mut report = ValidationReport::default();
    for loaded in set.iter() {
        for warning in lint_record(&loaded.record, lints) {
            debug!(path = %loaded.path.display(), "{warning}");
            report
                .warnings
                .push(format!("{}: {warning}", loaded.path.display()));
        }
        let verdict = validate_one(loaded, evaluator, limits)
            .with_context(|| format!("validate {}", loaded.path.display()))?;
        report.verdicts.push(verdict);
    }
    info!(
        asserts = report.total_asserts(),
        failed = report.failed_asserts(),
        "validation finished"
    );
    Ok(report)
}

/// Run every assertion of one record.
pub fn validate_one(
    loaded: &LoadedRecord,
    evaluator: &dyn Evaluator,
    limits: CallLimits,
) -> Result<RecordVerdict> {
    let record = &loaded.record;
    let mut failures = Vec::new();

    match evaluator.bind(&record.solution, record.arity(), limits)? {
        Binding::Bound => {
            for (offset, assert) in record.asserts.iter().enumerate() {
                let invocation = evaluator.invoke(&record.solution, &assert.arguments, limits)?;
                if let Some(failure) = judge(record, offset + 1, assert, invocation) {
                    debug!(
                        name = %record.name,
                        index = failure.index,
                        cause = failure.cause.label(),
                        "assertion failed"
                    );
                    failures.push(failure);
                }
            }
        }
        Binding::Rejected(reason) => {
            debug!(name = %record.name, %reason, "solution could not be bound");
            failures = record
                .asserts
                .iter()
                .enumerate()
                .map(|(offset, assert)| {
                    let cause = FailureCause::Unbindable(reason.clone());
                    failure(offset + 1, assert, None, cause)
                })
                .collect();
        }
    }

    Ok(RecordVerdict {
        name: record.name.clone(),
        level: record.level,
        path: loaded.path.clone(),
        total: record.asserts.len(),
        failures,
    })
}

fn judge(
    record: &Record,
    index: usize,
    assert: &Assert,
    invocation: Invocation,
) -> Option<AssertionFailure> {
    match invocation {
        Invocation::Returned(actual) => {
            if let Err(detail) = record.output_signature.ty.check(&actual, "result") {
                let cause = FailureCause::TypeMismatch(detail);
                return Some(failure(index, assert, Some(actual), cause));
            }
            if values_equal(&actual, &assert.expected) {
                None
            } else {
                Some(failure(index, assert, Some(actual), FailureCause::Mismatch))
            }
        }
        Invocation::WrongType(detail) => {
            Some(failure(index, assert, None, FailureCause::TypeMismatch(detail)))
        }
        Invocation::Raised(message) => {
            Some(failure(index, assert, None, FailureCause::Raised(message)))
        }
        Invocation::TimedOut(limit) => {
            Some(failure(index, assert, None, FailureCause::TimedOut(limit)))
        }
    }
}

fn failure(
    index: usize,
    assert: &Assert,
    actual: Option<Value>,
    cause: FailureCause,
) -> AssertionFailure {
    let differences = actual
        .as_ref()
        .map(|actual| differences(actual, &assert.expected))
        .unwrap_or_default();
    AssertionFailure {
        index,
        arguments: assert.arguments.clone(),
        expected: assert.expected.clone(),
        actual,
        cause,
        differences,
    }
}
