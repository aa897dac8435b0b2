//! Artifact emission and reading.
//!
//! Artifacts are pretty-printed JSON files laid out as
//! `<out>/<level>/<first tag | untagged>/<name>.json`. The whole tree is
//! rendered and schema-checked in memory, written to a staging directory next
//! to the output root, and swapped into place, so the output root is either
//! fully replaced or left untouched.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use jsonschema::Draft;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::core::record::Record;
use crate::io::loader::RecordSet;

const ARTIFACT_SCHEMA: &str = include_str!("../../schemas/artifact.schema.json");

/// Relative location of a record's artifact.
pub fn artifact_path(record: &Record) -> PathBuf {
    PathBuf::from(record.level.as_str())
        .join(record.primary_tag())
        .join(format!("{}.json", record.name))
}

/// Render one record exactly as it is written to disk.
pub fn render_artifact(record: &Record) -> Result<String> {
    let mut buf = serde_json::to_string_pretty(record)
        .with_context(|| format!("serialize artifact {}", record.name))?;
    buf.push('\n');
    Ok(buf)
}

/// Replace `out_dir` with one artifact per record. Returns the relative artifact paths.
#[instrument(skip_all, fields(out_dir = %out_dir.display()))]
pub fn emit_artifacts(set: &RecordSet, out_dir: &Path) -> Result<Vec<PathBuf>> {
    let schema: Value =
        serde_json::from_str(ARTIFACT_SCHEMA).context("parse bundled artifact schema")?;
    let validator = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .context("compile artifact schema")?;

    let mut rendered = Vec::with_capacity(set.len());
    for loaded in set.iter() {
        let record = &loaded.record;
        let value = serde_json::to_value(record)
            .with_context(|| format!("serialize artifact {}", record.name))?;
        let messages: Vec<String> = validator
            .iter_errors(&value)
            .map(|err| err.to_string())
            .collect();
        if !messages.is_empty() {
            bail!(
                "artifact for {} failed schema validation:\n- {}",
                loaded.path.display(),
                messages.join("\n- ")
            );
        }
        rendered.push((artifact_path(record), render_artifact(record)?));
    }

    ensure_replaceable(out_dir)?;
    let staging = sibling(out_dir, "staging")?;
    if staging.exists() {
        fs::remove_dir_all(&staging)
            .with_context(|| format!("remove stale staging dir {}", staging.display()))?;
    }
    if let Err(err) = write_tree(&staging, &rendered) {
        if let Err(cleanup) = fs::remove_dir_all(&staging) {
            warn!(err = %cleanup, "failed to remove staging dir");
        }
        return Err(err);
    }
    swap_into_place(&staging, out_dir)?;

    info!(artifacts = rendered.len(), "artifacts written");
    Ok(rendered.into_iter().map(|(path, _)| path).collect())
}

/// Refuse an output root that is, contains, or lies inside the task root.
pub fn ensure_output_outside(root: &Path, out_dir: &Path) -> Result<()> {
    let root = resolve(root)?;
    let out = resolve(out_dir)?;
    if root.starts_with(&out) || out.starts_with(&root) {
        bail!(
            "output dir {} overlaps task root {}; refusing to replace it",
            out.display(),
            root.display()
        );
    }
    Ok(())
}

/// An existing output root may only hold directories and `.json` artifacts.
fn ensure_replaceable(out_dir: &Path) -> Result<()> {
    if !out_dir.exists() {
        return Ok(());
    }
    if !out_dir.is_dir() {
        bail!("output path {} exists and is not a directory", out_dir.display());
    }
    for entry in WalkDir::new(out_dir).min_depth(1) {
        let entry = entry.with_context(|| format!("walk {}", out_dir.display()))?;
        let path = entry.path();
        let is_artifact = entry.file_type().is_file()
            && path.extension().and_then(|ext| ext.to_str()) == Some("json");
        if !entry.file_type().is_dir() && !is_artifact {
            bail!(
                "refusing to replace {}: {} is not an artifact",
                out_dir.display(),
                path.display()
            );
        }
    }
    Ok(())
}

/// Absolute, symlink-free form of `path`; components that do not exist yet are appended as-is.
fn resolve(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .context("read current directory")?
            .join(path)
    };
    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => break,
        }
    }
    let mut resolved = existing
        .canonicalize()
        .with_context(|| format!("resolve {}", path.display()))?;
    for name in missing.iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}

fn write_tree(root: &Path, files: &[(PathBuf, String)]) -> Result<()> {
    fs::create_dir_all(root).with_context(|| format!("create directory {}", root.display()))?;
    for (relative, contents) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        debug!(path = %relative.display(), "staged artifact");
    }
    Ok(())
}

fn swap_into_place(staging: &Path, out_dir: &Path) -> Result<()> {
    if !out_dir.exists() {
        fs::rename(staging, out_dir)
            .with_context(|| format!("move {} to {}", staging.display(), out_dir.display()))?;
        return Ok(());
    }

    let previous = sibling(out_dir, "previous")?;
    if previous.exists() {
        fs::remove_dir_all(&previous)
            .with_context(|| format!("remove stale dir {}", previous.display()))?;
    }
    fs::rename(out_dir, &previous)
        .with_context(|| format!("move {} aside", out_dir.display()))?;
    if let Err(err) = fs::rename(staging, out_dir) {
        if let Err(restore) = fs::rename(&previous, out_dir) {
            warn!(err = %restore, "failed to restore previous output dir");
        }
        return Err(err)
            .with_context(|| format!("move {} to {}", staging.display(), out_dir.display()));
    }
    fs::remove_dir_all(&previous)
        .with_context(|| format!("remove previous output {}", previous.display()))?;
    Ok(())
}

/// `<parent>/.<name>.<suffix>`, on the same filesystem as `dir`.
fn sibling(dir: &Path, suffix: &str) -> Result<PathBuf> {
    let name = dir
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("output path has no directory name {}", dir.display()))?;
    let parent = match dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)
        .with_context(|| format!("create directory {}", parent.display()))?;
    Ok(parent.join(format!(".{name}.{suffix}")))
}

/// One artifact read back from disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactEntry {
    /// Path relative to the artifact root, with `/` separators.
    pub path: String,
    pub task: Value,
}

/// Read every `.json` artifact under `root`, sorted by relative path.
pub fn read_artifacts(root: &Path) -> Result<Vec<ArtifactEntry>> {
    if !root.is_dir() {
        bail!("artifact root {} is not a directory", root.display());
    }
    let mut entries = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walk {}", root.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().and_then(|ext| ext.to_str()) != Some("json")
        {
            continue;
        }
        let contents =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let task: Value =
            serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
        let relative = path.strip_prefix(root).unwrap_or(path);
        entries.push(ArtifactEntry {
            path: relative
                .components()
                .map(|part| part.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            task,
        });
    }
    Ok(entries)
}
