//! Human-readable validation report.

use std::fmt::Write as _;

use crate::core::verdict::{AssertionFailure, ValidationReport};

/// Render failures (and, when `verbose`, passing records) followed by a summary.
pub fn render_report(report: &ValidationReport, verbose: bool) -> String {
    let mut out = String::new();
    for verdict in &report.verdicts {
        if verdict.passed() {
            if verbose {
                let _ = writeln!(
                    out,
                    "ok   {} ({}/{} assertions)",
                    verdict.path.display(),
                    verdict.passed_count(),
                    verdict.total
                );
            }
            continue;
        }
        let _ = writeln!(
            out,
            "FAIL {} [{}]: {}/{} assertions failed",
            verdict.path.display(),
            verdict.name,
            verdict.failures.len(),
            verdict.total
        );
        for failure in &verdict.failures {
            render_failure(&mut out, failure);
        }
    }
    let _ = writeln!(out, "{}", summary_line(report));
    out
}

fn render_failure(out: &mut String, failure: &AssertionFailure) {
    let _ = write!(out, "  #{} {}", failure.index, failure.cause.label());
    match failure.cause.detail() {
        Some(detail) => {
            let _ = writeln!(out, ": {detail}");
        }
        None => out.push('\n'),
    }
    let _ = writeln!(out, "    arguments: {}", render_arguments(failure));
    let _ = writeln!(out, "    expected:  {}", failure.expected);
    if let Some(actual) = &failure.actual {
        let _ = writeln!(out, "    actual:    {actual}");
    }
    if !failure.differences.is_empty() {
        let _ = writeln!(out, "    differences:");
        for difference in &failure.differences {
            let _ = writeln!(out, "      {difference}");
        }
    }
}

fn render_arguments(failure: &AssertionFailure) -> String {
    let parts: Vec<String> = failure.arguments.iter().map(|arg| arg.to_string()).collect();
    format!("({})", parts.join(", "))
}

/// One-line totals, e.g. `report: records=2 failed_records=1 asserts=6 failed_asserts=2`.
pub fn summary_line(report: &ValidationReport) -> String {
    format!(
        "report: records={} failed_records={} asserts={} failed_asserts={} warnings={}",
        report.verdicts.len(),
        report.failed_records().count(),
        report.total_asserts(),
        report.failed_asserts(),
        report.warnings.len()
    )
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;
    use crate::core::record::Level;
    use crate::core::verdict::{FailureCause, RecordVerdict};
    use serde_json::json;

    fn report() -> ValidationReport {
        ValidationReport {
            verdicts: vec![
                RecordVerdict {
                    name: "sum_of_two".to_string(),
                    level: Level::Elementary,
                    path: PathBuf::from("elementary/math/sum_of_two.toml"),
                    total: 3,
                    failures: Vec::new(),
                },
                RecordVerdict {
                    name: "split_words".to_string(),
                    level: Level::Easy,
                    path: PathBuf::from("easy/strings/split_words.toml"),
                    total: 4,
                    failures: vec![
                        AssertionFailure {
                            index: 2,
                            arguments: vec![json!("a b"), json!(1)],
                            expected: json!(["a", "b"]),
                            actual: Some(json!(["a"])),
                            cause: FailureCause::Mismatch,
                            differences: vec![
                                "value -> different number of elements: expected 2, got 1"
                                    .to_string(),
                                "[1] -> missing element: \"b\"".to_string(),
                            ],
                        },
                        AssertionFailure {
                            index: 4,
                            arguments: vec![json!(""), json!(0)],
                            expected: json!([]),
                            actual: None,
                            cause: FailureCause::TimedOut(Duration::from_millis(1500)),
                            differences: Vec::new(),
                        },
                    ],
                },
            ],
            warnings: vec!["x".to_string()],
        }
    }

    #[test]
    fn renders_failures_with_details() {
        let text = render_report(&report(), false);
        assert!(!text.contains("ok   elementary"));
        assert!(text.contains("FAIL easy/strings/split_words.toml [split_words]: 2/4 assertions failed"));
        assert!(text.contains("  #2 assertion failure\n"));
        assert!(text.contains("    arguments: (\"a b\", 1)\n"));
        assert!(text.contains("    expected:  [\"a\",\"b\"]\n"));
        assert!(text.contains("    actual:    [\"a\"]\n"));
        assert!(text.contains("      [1] -> missing element: \"b\"\n"));
        assert!(text.contains("  #4 timeout: exceeded 1.5s\n"));
        assert!(text.ends_with(
            "report: records=2 failed_records=1 asserts=7 failed_asserts=2 warnings=1\n"
        ));
    }

    #[test]
    fn verbose_lists_passing_records() {
        let text = render_report(&report(), true);
        assert!(text.starts_with("ok   elementary/math/sum_of_two.toml (3/3 assertions)\n"));
    }
}
