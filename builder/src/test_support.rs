//! Test-only fixtures: record sources, temp task trees, and an in-process evaluator.

use std::cell::Cell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde_json::Value;

use crate::core::record::Record;
use crate::io::evaluator::{Binding, CallLimits, Evaluator, Invocation};

/// Reference solution of the `sum_of_two` fixture.
pub const SUM_SOLUTION: &str = "def solution(a, b):\n    return a + b\n";

/// A clean record: no lint warnings apart from the assert count.
pub const SUM_OF_TWO_TOML: &str = r#"name = "sum_of_two"
level = "elementary"
tags = ["math"]
time_to_solve_sec = 120
description_en = "Return the sum of `a` and `b`."
description_ru = "Сложите два числа."
solution = """
def solution(a, b):
    return a + b
"""
examples = """
solution(0, 0) == 0
solution(1, 2) == 3
"""

[[input_signature]]
argument_name = "a"
type = { name = "integer" }

[[input_signature]]
argument_name = "b"
type = { name = "integer" }

[output_signature]
type = { name = "integer" }

[[asserts]]
arguments = [1, 2]
expected = 3

[[asserts]]
arguments = [-5, 7]
expected = 2

[[asserts]]
arguments = [0, 0]
expected = 0
"#;

/// The `sum_of_two` fixture parsed into memory.
pub fn sum_record() -> Record {
    toml::from_str(SUM_OF_TWO_TOML).expect("sum_of_two fixture parses")
}

/// The `sum_of_two` fixture source under another name.
pub fn sum_task_toml(name: &str) -> String {
    SUM_OF_TWO_TOML.replacen("name = \"sum_of_two\"", &format!("name = \"{name}\""), 1)
}

/// Temporary task tree populated with `(relative path, contents)` pairs.
pub fn task_tree(files: &[(&str, &str)]) -> tempfile::TempDir {
    let temp = tempfile::tempdir().expect("tempdir");
    for (relative, contents) in files {
        write_task(temp.path(), relative, contents);
    }
    temp
}

/// Write a record file below `root`, creating parent directories.
pub fn write_task(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create task dir");
    }
    fs::write(&path, contents).expect("write task");
    path
}

type Script = Box<dyn Fn(&[Value]) -> Invocation>;

/// Evaluator answering from closures keyed by solution text.
///
/// Unknown solutions are rejected at bind time.
#[derive(Default)]
pub struct ScriptedEvaluator {
    scripts: HashMap<String, Script>,
    invocations: Cell<usize>,
}

impl ScriptedEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, solution: &str, script: impl Fn(&[Value]) -> Invocation + 'static) -> Self {
        self.scripts.insert(solution.to_string(), Box::new(script));
        self
    }

    /// Evaluator that knows the `sum_of_two` solution.
    pub fn summing() -> Self {
        Self::new().with(SUM_SOLUTION, |arguments| {
            let total: i64 = arguments.iter().filter_map(Value::as_i64).sum();
            Invocation::Returned(Value::from(total))
        })
    }

    /// Number of `invoke` calls so far.
    pub fn invocations(&self) -> usize {
        self.invocations.get()
    }
}

impl Evaluator for ScriptedEvaluator {
    fn bind(&self, solution: &str, _arity: usize, _limits: CallLimits) -> Result<Binding> {
        if self.scripts.contains_key(solution) {
            Ok(Binding::Bound)
        } else {
            Ok(Binding::Rejected(
                "solution code does not define a 'solution' function".to_string(),
            ))
        }
    }

    fn invoke(
        &self,
        solution: &str,
        arguments: &[Value],
        _limits: CallLimits,
    ) -> Result<Invocation> {
        self.invocations.set(self.invocations.get() + 1);
        match self.scripts.get(solution) {
            Some(script) => Ok(script(arguments)),
            None => Ok(Invocation::Raised(
                "NameError: name 'solution' is not defined".to_string(),
            )),
        }
    }
}
