//! Structural checks that make a record malformed.
//!
//! These run after parsing and before any solution executes. Any failure here
//! aborts the whole run.

use anyhow::{Result, bail};

use super::record::Record;

/// Validate a parsed record's structure.
///
/// Checks identifier safety, required non-empty fields, and that every
/// assertion matches the declared signatures.
pub fn validate_record(record: &Record) -> Result<()> {
    validate_name(&record.name)?;
    for tag in &record.tags {
        validate_tag(tag)?;
    }
    if record.time_to_solve_sec == 0 {
        bail!("time_to_solve_sec must be > 0");
    }
    if record.description_en.trim().is_empty() {
        bail!("description_en must be non-empty");
    }
    if record.description_ru.trim().is_empty() {
        bail!("description_ru must be non-empty");
    }
    if record.solution.trim().is_empty() {
        bail!("solution must be non-empty");
    }
    if record.asserts.is_empty() {
        bail!("asserts must be a non-empty array");
    }
    for (index, argument) in record.input_signature.iter().enumerate() {
        if argument.argument_name.trim().is_empty() {
            bail!("input_signature[{index}].argument_name must be non-empty");
        }
    }
    validate_asserts(record)
}

fn validate_asserts(record: &Record) -> Result<()> {
    let output = &record.output_signature.ty;
    for (offset, assert) in record.asserts.iter().enumerate() {
        let number = offset + 1;
        if assert.arguments.len() != record.arity() {
            bail!(
                "assert #{number}: expected {} argument(s) per input_signature, got {}",
                record.arity(),
                assert.arguments.len()
            );
        }
        for (position, (value, argument)) in assert
            .arguments
            .iter()
            .zip(&record.input_signature)
            .enumerate()
        {
            let path = format!("arguments[{position}]");
            if let Err(err) = argument.ty.check(value, &path) {
                bail!(
                    "assert #{number}: argument '{}' type mismatch: {err}",
                    argument.argument_name
                );
            }
            if let Err(err) = argument.ty.check_int_bounds(value, &path) {
                bail!("assert #{number}: {err}");
            }
        }
        if let Err(err) = output.check(&assert.expected, "expected") {
            bail!("assert #{number}: expected value type mismatch: {err}");
        }
        if let Err(err) = output.check_int_bounds(&assert.expected, "expected") {
            bail!("assert #{number}: {err}");
        }
    }
    Ok(())
}

/// Names become path components, so only `[A-Za-z0-9_]` is accepted.
fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("name must be non-empty");
    }
    if !name
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    {
        bail!("name '{name}' must use [A-Za-z0-9_] only");
    }
    Ok(())
}

fn validate_tag(tag: &str) -> Result<()> {
    if tag.trim().is_empty() {
        bail!("tags must be non-empty strings");
    }
    if tag.contains('/') || tag.contains('\\') || tag.contains("..") {
        bail!("tag '{tag}' must not contain path separators or '..'");
    }
    Ok(())
}
