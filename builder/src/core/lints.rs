//! Non-fatal content lints.
//!
//! Lints describe authoring defects that do not invalidate a record: they are
//! reported as warnings and never change the run verdict.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::record::{Level, Record};

static LOWERCASE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(_[a-z0-9]+)*$").expect("valid name regex"));

/// Thresholds used by the lints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LintSettings {
    /// Minimum number of asserts per record (inclusive).
    pub min_asserts: usize,
    /// Maximum number of asserts per record (inclusive).
    pub max_asserts: usize,
    /// Skip the assert-count lint entirely.
    pub skip_assert_count: bool,
    /// Largest solution (non-blank lines) still considered `elementary`.
    pub elementary_max_lines: usize,
    /// Largest solution still considered `easy`.
    pub easy_max_lines: usize,
    /// Largest solution still considered `medium`; anything longer is `hard`.
    pub medium_max_lines: usize,
}

impl Default for LintSettings {
    fn default() -> Self {
        Self {
            min_asserts: 25,
            max_asserts: 30,
            skip_assert_count: false,
            elementary_max_lines: 5,
            easy_max_lines: 10,
            medium_max_lines: 20,
        }
    }
}

impl LintSettings {
    /// Level implied by the length of a solution.
    pub fn level_for_solution(&self, solution: &str) -> Level {
        let lines = solution_lines(solution);
        if lines <= self.elementary_max_lines {
            Level::Elementary
        } else if lines <= self.easy_max_lines {
            Level::Easy
        } else if lines <= self.medium_max_lines {
            Level::Medium
        } else {
            Level::Hard
        }
    }
}

/// Count non-blank lines of solution source.
pub fn solution_lines(solution: &str) -> usize {
    solution.lines().filter(|line| !line.trim().is_empty()).count()
}

/// Run every lint against a record and return warnings in a stable order.
pub fn lint_record(record: &Record, settings: &LintSettings) -> Vec<String> {
    let mut warnings = Vec::new();

    if !LOWERCASE_NAME.is_match(&record.name) {
        warnings.push(format!(
            "name '{}' should be lowercase-with-underscores",
            record.name
        ));
    }

    let count = record.asserts.len();
    if !settings.skip_assert_count && (count < settings.min_asserts || count > settings.max_asserts)
    {
        warnings.push(format!(
            "has {count} asserts (expected {}..={})",
            settings.min_asserts, settings.max_asserts
        ));
    }

    for pair in record.examples.windows(2) {
        if pair[1].chars().count() < pair[0].chars().count() {
            warnings.push(format!(
                "examples must be ascending by length: '{}' comes after '{}'",
                pair[1], pair[0]
            ));
        }
    }

    for example in &record.examples {
        if !example_is_derivable(example, record) {
            warnings.push(format!("example '{example}' does not match any assert"));
        }
    }

    let bucket = settings.level_for_solution(&record.solution);
    if bucket != record.level {
        warnings.push(format!(
            "level '{}' does not match solution length ({} lines suggests '{}')",
            record.level,
            solution_lines(&record.solution),
            bucket
        ));
    }

    warnings
}

/// An example is derivable when some assertion's arguments and expected value
/// all appear in it, compared without whitespace, quote style or case.
pub fn example_is_derivable(example: &str, record: &Record) -> bool {
    let haystack = normalize(example);
    record.asserts.iter().any(|assert| {
        assert
            .arguments
            .iter()
            .chain(std::iter::once(&assert.expected))
            .all(|value| haystack.contains(&normalize(&render_compact(value))))
    })
}

fn render_compact(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

fn normalize(text: &str) -> String {
    text.chars()
        .filter(|ch| !ch.is_whitespace())
        .map(|ch| if ch == '\'' { '"' } else { ch })
        .flat_map(char::to_lowercase)
        .collect()
}
