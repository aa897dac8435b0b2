//! Builder configuration stored in `builder.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::lints::LintSettings;
use crate::io::evaluator::CallLimits;

/// Default location of the configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "builder.toml";

/// Builder configuration (TOML).
///
/// Missing fields default to the values used by the content repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BuilderConfig {
    /// Root of the emitted artifact tree.
    pub output_dir: PathBuf,

    pub evaluator: EvaluatorConfig,

    pub asserts: AssertsConfig,

    pub levels: LevelsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Interpreter executable.
    pub program: String,

    /// Arguments placed before the harness script (which is passed as the last argument).
    pub args: Vec<String>,

    /// Wall-clock limit per solution call, in seconds.
    pub timeout_secs: u64,

    /// Truncate interpreter stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AssertsConfig {
    pub min: usize,
    pub max: usize,
}

/// Largest solution (non-blank lines) for each level; longer solutions are `hard`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LevelsConfig {
    pub elementary: usize,
    pub easy: usize,
    pub medium: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("release"),
            evaluator: EvaluatorConfig::default(),
            asserts: AssertsConfig::default(),
            levels: LevelsConfig::default(),
        }
    }
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec!["-c".to_string()],
            timeout_secs: 10,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl Default for AssertsConfig {
    fn default() -> Self {
        Self { min: 25, max: 30 }
    }
}

impl Default for LevelsConfig {
    fn default() -> Self {
        Self {
            elementary: 5,
            easy: 10,
            medium: 20,
        }
    }
}

impl BuilderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(anyhow!("output_dir must be non-empty"));
        }
        if self.evaluator.program.trim().is_empty() {
            return Err(anyhow!("evaluator.program must be non-empty"));
        }
        if self.evaluator.timeout_secs == 0 {
            return Err(anyhow!("evaluator.timeout_secs must be > 0"));
        }
        if self.evaluator.output_limit_bytes == 0 {
            return Err(anyhow!("evaluator.output_limit_bytes must be > 0"));
        }
        if self.asserts.min > self.asserts.max {
            return Err(anyhow!("asserts.min must be <= asserts.max"));
        }
        if !(self.levels.elementary < self.levels.easy && self.levels.easy < self.levels.medium) {
            return Err(anyhow!(
                "levels must be strictly ascending (elementary < easy < medium)"
            ));
        }
        Ok(())
    }

    pub fn call_limits(&self) -> CallLimits {
        CallLimits {
            timeout: Duration::from_secs(self.evaluator.timeout_secs),
            output_limit_bytes: self.evaluator.output_limit_bytes,
        }
    }

    pub fn lint_settings(&self, skip_assert_count: bool) -> LintSettings {
        LintSettings {
            min_asserts: self.asserts.min,
            max_asserts: self.asserts.max,
            skip_assert_count,
            elementary_max_lines: self.levels.elementary,
            easy_max_lines: self.levels.easy,
            medium_max_lines: self.levels.medium,
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `BuilderConfig::default()`.
pub fn load_config(path: &Path) -> Result<BuilderConfig> {
    if !path.exists() {
        let cfg = BuilderConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: BuilderConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}
