//! Run orchestration: load, validate, then emit or report.
//!
//! A run moves through [`Phase`]s:
//! `Loading -> Validating -> (Emitting -> Done) | (Reporting -> Aborted)`.
//! Fatal load errors end the run with `Err` before validation starts.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::info;

use crate::core::lints::LintSettings;
use crate::core::verdict::ValidationReport;
use crate::io::artifact::{emit_artifacts, ensure_output_outside};
use crate::io::evaluator::{CallLimits, Evaluator};
use crate::io::loader::discover_records;
use crate::validate::validate_records;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Validating,
    Emitting,
    Reporting,
    Done,
    Aborted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Loading => "loading",
            Phase::Validating => "validating",
            Phase::Emitting => "emitting",
            Phase::Reporting => "reporting",
            Phase::Done => "done",
            Phase::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

/// Inputs of one run.
#[derive(Debug, Clone)]
pub struct RunOptions<'a> {
    pub root: &'a Path,
    /// Artifact root; `None` validates without writing anything.
    pub out_dir: Option<&'a Path>,
    pub limits: CallLimits,
    pub lints: LintSettings,
}

/// Result of a run that got past loading.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// `Done` or `Aborted`.
    pub phase: Phase,
    pub report: ValidationReport,
    /// Relative paths of emitted artifacts; empty unless the run emitted.
    pub artifacts: Vec<PathBuf>,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        self.phase == Phase::Done
    }
}

fn enter(phase: Phase) {
    info!(%phase, "entering phase");
}

pub fn run_pipeline(options: &RunOptions<'_>, evaluator: &dyn Evaluator) -> Result<RunOutcome> {
    if let Some(out_dir) = options.out_dir {
        ensure_output_outside(options.root, out_dir)?;
    }
    enter(Phase::Loading);
    let set = discover_records(options.root)?;

    enter(Phase::Validating);
    let report = validate_records(&set, evaluator, options.limits, &options.lints)?;

    if !report.all_passed() {
        enter(Phase::Reporting);
        enter(Phase::Aborted);
        return Ok(RunOutcome {
            phase: Phase::Aborted,
            report,
            artifacts: Vec::new(),
        });
    }

    let artifacts = match options.out_dir {
        Some(out_dir) => {
            enter(Phase::Emitting);
            emit_artifacts(&set, out_dir)?
        }
        None => Vec::new(),
    };
    enter(Phase::Done);
    Ok(RunOutcome {
        phase: Phase::Done,
        report,
        artifacts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::evaluator::Invocation;
    use crate::io::loader::LoadError;
    use crate::test_support::{
        SUM_OF_TWO_TOML, SUM_SOLUTION, ScriptedEvaluator, sum_task_toml, write_task,
    };
    use serde_json::json;

    fn options<'a>(root: &'a Path, out_dir: Option<&'a Path>) -> RunOptions<'a> {
        RunOptions {
            root,
            out_dir,
            limits: CallLimits::default_limits(),
            lints: LintSettings::default(),
        }
    }

    #[test]
    fn passing_run_emits_artifacts() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("tasks");
        let out = temp.path().join("release");
        write_task(&root, "elementary/math/sum_of_two.toml", SUM_OF_TWO_TOML);

        let outcome = run_pipeline(&options(&root, Some(&out)), &ScriptedEvaluator::summing())
            .expect("run");
        assert!(outcome.succeeded());
        assert_eq!(
            outcome.artifacts,
            vec![PathBuf::from("elementary/math/sum_of_two.json")]
        );
        assert!(out.join("elementary/math/sum_of_two.json").is_file());
    }

    #[test]
    fn one_failure_blocks_all_artifacts() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("tasks");
        let out = temp.path().join("release");
        write_task(&root, "elementary/math/sum_of_two.toml", SUM_OF_TWO_TOML);
        let broken = sum_task_toml("broken_sum").replace("return a + b", "return a - b");
        write_task(&root, "elementary/math/broken_sum.toml", &broken);

        let evaluator = ScriptedEvaluator::summing().with(
            "def solution(a, b):\n    return a - b\n",
            |arguments| {
                let a = arguments[0].as_i64().unwrap_or_default();
                let b = arguments[1].as_i64().unwrap_or_default();
                Invocation::Returned(json!(a - b))
            },
        );
        let outcome = run_pipeline(&options(&root, Some(&out)), &evaluator).expect("run");
        assert_eq!(outcome.phase, Phase::Aborted);
        assert!(outcome.artifacts.is_empty());
        assert!(!out.exists());
        let failed: Vec<_> = outcome
            .report
            .failed_records()
            .map(|verdict| verdict.name.as_str())
            .collect();
        assert_eq!(failed, vec!["broken_sum"]);
    }

    #[test]
    fn check_only_run_writes_nothing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("tasks");
        write_task(&root, "elementary/math/sum_of_two.toml", SUM_OF_TWO_TOML);

        let outcome =
            run_pipeline(&options(&root, None), &ScriptedEvaluator::summing()).expect("run");
        assert!(outcome.succeeded());
        assert!(outcome.artifacts.is_empty());
    }

    #[test]
    fn duplicate_names_abort_before_execution() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("tasks");
        write_task(&root, "easy/math/Sum_Of_Two.toml", &sum_task_toml("Sum_Of_Two"));
        write_task(&root, "easy/math/sum_of_two.toml", SUM_OF_TWO_TOML);

        let evaluator = ScriptedEvaluator::new().with(SUM_SOLUTION, |_| {
            panic!("solutions must not run when loading fails")
        });
        let err = run_pipeline(&options(&root, None), &evaluator).expect_err("duplicate");
        assert!(matches!(
            err.downcast_ref::<LoadError>(),
            Some(LoadError::DuplicateName { .. })
        ));
    }

    #[test]
    fn output_overlapping_task_root_is_refused() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("tasks");
        let source = write_task(&root, "elementary/math/sum_of_two.toml", SUM_OF_TWO_TOML);

        for out in [root.clone(), temp.path().to_path_buf(), root.join("release")] {
            let evaluator = ScriptedEvaluator::new().with(SUM_SOLUTION, |_| {
                panic!("solutions must not run when the output dir is refused")
            });
            let err = run_pipeline(&options(&root, Some(&out)), &evaluator).expect_err("overlap");
            assert!(err.to_string().contains("overlaps task root"), "{err}");
            assert!(source.is_file());
        }
        assert!(!root.join("release").exists());
    }

    #[test]
    fn phases_render_lowercase() {
        assert_eq!(Phase::Emitting.to_string(), "emitting");
    }
}
