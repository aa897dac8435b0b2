//! In-memory representation of one exercise record.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::signature::TypeDescriptor;

/// Difficulty bucket. Ordered from easiest to hardest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Elementary,
    Easy,
    Medium,
    Hard,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::Elementary, Level::Easy, Level::Medium, Level::Hard];

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Elementary => "elementary",
            Level::Easy => "easy",
            Level::Medium => "medium",
            Level::Hard => "hard",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One positional argument of the reference solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Argument {
    pub argument_name: String,
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSignature {
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
}

/// A single (arguments, expected) test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Assert {
    pub arguments: Vec<Value>,
    pub expected: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// One exercise definition.
///
/// Field order here is the field order of emitted artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Record {
    pub name: String,
    pub level: Level,
    #[serde(default)]
    pub tags: Vec<String>,
    pub time_to_solve_sec: u64,
    pub description_en: String,
    pub description_ru: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<String>,
    #[serde(default)]
    pub input_signature: Vec<Argument>,
    pub output_signature: OutputSignature,
    pub solution: String,
    #[serde(default, deserialize_with = "deserialize_examples")]
    pub examples: Vec<String>,
    pub asserts: Vec<Assert>,
}

impl Record {
    /// Tag used for the artifact directory.
    pub fn primary_tag(&self) -> &str {
        self.tags.first().map(String::as_str).unwrap_or("untagged")
    }

    pub fn arity(&self) -> usize {
        self.input_signature.len()
    }
}

/// Examples may be authored as one multiline string or as an array of lines.
#[derive(Deserialize)]
#[serde(untagged)]
enum ExamplesInput {
    Text(String),
    Lines(Vec<String>),
}

fn deserialize_examples<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let lines = match ExamplesInput::deserialize(deserializer)? {
        ExamplesInput::Text(text) => split_example_lines(&text),
        ExamplesInput::Lines(lines) => lines
            .into_iter()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect(),
    };
    Ok(lines)
}

/// Split a multiline examples block into lines, dropping blanks and code fences.
pub fn split_example_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("```"))
        .map(str::to_string)
        .collect()
}
