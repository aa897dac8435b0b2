//! Record discovery and parsing.
//!
//! Loading is read-only. Any malformed record or duplicated name aborts the
//! run with a [`LoadError`].

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use crate::core::checks::validate_record;
use crate::core::record::{Level, Record};

/// Fatal loading errors. Surfaced through `anyhow` and recoverable with `downcast_ref`.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("malformed record {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("duplicate task name '{name}': {} and {}", first.display(), second.display())]
    DuplicateName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// A parsed record and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedRecord {
    /// Path relative to the content root.
    pub path: PathBuf,
    pub record: Record,
}

/// All records under a root, grouped by level in discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    by_level: BTreeMap<Level, Vec<LoadedRecord>>,
}

impl RecordSet {
    pub fn push(&mut self, loaded: LoadedRecord) {
        self.by_level
            .entry(loaded.record.level)
            .or_default()
            .push(loaded);
    }

    pub fn level(&self, level: Level) -> &[LoadedRecord] {
        self.by_level.get(&level).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate levels from easiest to hardest, records in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &LoadedRecord> {
        self.by_level.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.by_level.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Load every `.toml` record under `root`, or the single record file `root` names.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn discover_records(root: &Path) -> Result<RecordSet> {
    let (base, files) = if root.is_file() {
        (root.parent().unwrap_or(Path::new("")), vec![root.to_path_buf()])
    } else if root.is_dir() {
        (root, toml_files(root)?)
    } else {
        bail!("task root {} does not exist", root.display());
    };

    let mut set = RecordSet::default();
    let mut seen: HashMap<String, PathBuf> = HashMap::new();
    for path in files {
        let relative = path.strip_prefix(base).unwrap_or(&path).to_path_buf();
        let record = load_record(&path)?;
        let key = record.name.to_lowercase();
        if let Some(first) = seen.get(&key) {
            return Err(LoadError::DuplicateName {
                name: record.name,
                first: base.join(first),
                second: path,
            }
            .into());
        }
        seen.insert(key, relative.clone());
        debug!(name = %record.name, path = %relative.display(), "loaded record");
        set.push(LoadedRecord {
            path: relative,
            record,
        });
    }
    info!(records = set.len(), "discovered records");
    Ok(set)
}

/// Parse and structurally validate one record file.
pub fn load_record(path: &Path) -> Result<Record> {
    let contents = read_source(path)?;
    let malformed = |reason: String| LoadError::Malformed {
        path: path.to_path_buf(),
        reason,
    };
    let record: Record = toml::from_str(&contents)
        .map_err(|err| malformed(err.to_string().trim_end().to_string()))?;
    validate_record(&record).map_err(|err| malformed(format!("{err:#}")))?;

    let stem = path.file_stem().and_then(|stem| stem.to_str()).unwrap_or("");
    if stem != record.name {
        return Err(malformed(format!(
            "name '{}' does not match file name '{stem}'",
            record.name
        ))
        .into());
    }
    Ok(record)
}

/// Files sharing one case-insensitive task name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCollision {
    /// Lowercased name.
    pub name: String,
    pub paths: Vec<PathBuf>,
}

/// Names of every record under several roots, checked case-insensitively.
///
/// Only `name` is read, so this also works on trees that would not load fully.
/// Missing roots are skipped.
pub fn find_name_collisions(roots: &[PathBuf]) -> Result<(usize, Vec<NameCollision>)> {
    #[derive(Deserialize)]
    struct NameOnly {
        name: String,
    }

    let mut by_name: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    let mut total = 0usize;
    for root in roots {
        if !root.exists() {
            debug!(root = %root.display(), "skipping missing root");
            continue;
        }
        for path in toml_files(root)? {
            let contents = read_source(&path)?;
            let parsed: NameOnly = toml::from_str(&contents).map_err(|err| LoadError::Malformed {
                path: path.clone(),
                reason: err.to_string().trim_end().to_string(),
            })?;
            if parsed.name.trim().is_empty() {
                return Err(LoadError::Malformed {
                    path,
                    reason: "name must be non-empty".to_string(),
                }
                .into());
            }
            by_name
                .entry(parsed.name.to_lowercase())
                .or_default()
                .push(path);
            total += 1;
        }
    }

    let collisions = by_name
        .into_iter()
        .filter(|(_, paths)| paths.len() > 1)
        .map(|(name, paths)| NameCollision { name, paths })
        .collect();
    Ok((total, collisions))
}

/// Record text. Unreadable files are I/O errors; undecodable ones are malformed records.
fn read_source(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    String::from_utf8(bytes).map_err(|err| {
        LoadError::Malformed {
            path: path.to_path_buf(),
            reason: format!("file is not valid UTF-8: {err}"),
        }
        .into()
    })
}

fn toml_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walk {}", root.display()))?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().and_then(|ext| ext.to_str()) == Some("toml")
        {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{SUM_OF_TWO_TOML, sum_task_toml, write_task};

    #[test]
    fn loads_records_grouped_by_level() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_task(temp.path(), "elementary/math/sum_of_two.toml", SUM_OF_TWO_TOML);
        write_task(
            temp.path(),
            "hard/math/b_sum.toml",
            &sum_task_toml("b_sum").replace("level = \"elementary\"", "level = \"hard\""),
        );
        write_task(temp.path(), "elementary/math/a_sum.toml", &sum_task_toml("a_sum"));
        write_task(temp.path(), "elementary/notes.md", "not a record");

        let set = discover_records(temp.path()).expect("load");
        assert_eq!(set.len(), 3);
        let names: Vec<_> = set
            .level(Level::Elementary)
            .iter()
            .map(|loaded| loaded.record.name.as_str())
            .collect();
        assert_eq!(names, vec!["a_sum", "sum_of_two"]);
        assert_eq!(set.level(Level::Hard).len(), 1);
        assert!(set.level(Level::Medium).is_empty());
        assert_eq!(
            set.level(Level::Elementary)[0].path,
            PathBuf::from("elementary/math/a_sum.toml")
        );
        let order: Vec<_> = set.iter().map(|loaded| loaded.record.name.as_str()).collect();
        assert_eq!(order, vec!["a_sum", "sum_of_two", "b_sum"]);
    }

    #[test]
    fn case_variant_names_are_duplicates() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_task(temp.path(), "easy/math/Sum_Of_Two.toml", &sum_task_toml("Sum_Of_Two"));
        write_task(temp.path(), "medium/math/sum_of_two.toml", SUM_OF_TWO_TOML);

        let err = discover_records(temp.path()).expect_err("duplicate");
        match err.downcast_ref::<LoadError>() {
            Some(LoadError::DuplicateName {
                first, second, ..
            }) => {
                assert!(first.ends_with("easy/math/Sum_Of_Two.toml"));
                assert!(second.ends_with("medium/math/sum_of_two.toml"));
            }
            other => panic!("expected duplicate name, got {other:?}"),
        }
    }

    #[test]
    fn missing_description_is_malformed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let contents = SUM_OF_TWO_TOML.replace("description_ru = \"Сложите два числа.\"\n", "");
        write_task(temp.path(), "elementary/math/sum_of_two.toml", &contents);

        let err = discover_records(temp.path()).expect_err("malformed");
        match err.downcast_ref::<LoadError>() {
            Some(LoadError::Malformed { path, reason }) => {
                assert!(path.ends_with("sum_of_two.toml"));
                assert!(reason.contains("description_ru"), "{reason}");
            }
            other => panic!("expected malformed, got {other:?}"),
        }
        assert!(err.to_string().contains("sum_of_two.toml"));
    }

    #[test]
    fn unknown_type_name_is_malformed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let contents = SUM_OF_TWO_TOML.replacen(
            "type = { name = \"integer\" }",
            "type = { name = \"decimal\" }",
            1,
        );
        write_task(temp.path(), "elementary/math/sum_of_two.toml", &contents);

        let err = discover_records(temp.path()).expect_err("malformed");
        assert!(err.to_string().contains("unknown type name 'decimal'"), "{err}");
    }

    #[test]
    fn name_must_match_file_stem() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_task(temp.path(), "elementary/math/other.toml", SUM_OF_TWO_TOML);

        let err = discover_records(temp.path()).expect_err("malformed");
        assert!(err.to_string().contains("does not match file name 'other'"));
    }

    #[test]
    fn missing_root_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = discover_records(&temp.path().join("nope")).expect_err("missing");
        assert!(err.to_string().contains("does not exist"));
        assert!(err.downcast_ref::<LoadError>().is_none());
    }

    #[test]
    fn single_file_root_loads_one_record() {
        let temp = tempfile::tempdir().expect("tempdir");
        let file = write_task(temp.path(), "elementary/math/sum_of_two.toml", SUM_OF_TWO_TOML);
        write_task(temp.path(), "elementary/math/other.toml", &sum_task_toml("other"));

        let set = discover_records(&file).expect("load");
        assert_eq!(set.len(), 1);
        let loaded = set.iter().next().expect("one record");
        assert_eq!(loaded.path, PathBuf::from("sum_of_two.toml"));
        assert_eq!(loaded.record.name, "sum_of_two");
    }

    #[test]
    fn parse_errors_keep_their_location() {
        let temp = tempfile::tempdir().expect("tempdir");
        let broken = SUM_OF_TWO_TOML.replace("level = \"elementary\"", "level = elementary");
        write_task(temp.path(), "elementary/math/sum_of_two.toml", &broken);

        let err = discover_records(temp.path()).expect_err("malformed");
        match err.downcast_ref::<LoadError>() {
            Some(LoadError::Malformed { reason, .. }) => {
                assert!(reason.contains("line 2"), "{reason}");
            }
            other => panic!("expected malformed record, got {other:?}"),
        }
    }

    #[test]
    fn invalid_utf8_is_a_malformed_record() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("elementary/math/sum_of_two.toml");
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, [b'n', b'a', 0xff, 0xfe]).expect("write");

        let err = discover_records(temp.path()).expect_err("malformed");
        match err.downcast_ref::<LoadError>() {
            Some(LoadError::Malformed { path: bad, reason }) => {
                assert_eq!(bad, &path);
                assert!(reason.contains("not valid UTF-8"), "{reason}");
            }
            other => panic!("expected malformed record, got {other:?}"),
        }

        let err = find_name_collisions(&[temp.path().to_path_buf()]).expect_err("malformed");
        assert!(matches!(
            err.downcast_ref::<LoadError>(),
            Some(LoadError::Malformed { .. })
        ));
    }

    #[test]
    fn collisions_span_roots() {
        let temp = tempfile::tempdir().expect("tempdir");
        let public = temp.path().join("tasks");
        let private = temp.path().join("private");
        write_task(&public, "easy/math/sum_of_two.toml", SUM_OF_TWO_TOML);
        write_task(&public, "easy/math/other.toml", &sum_task_toml("other"));
        write_task(&private, "hard/x/SUM_OF_TWO.toml", "name = \"SUM_OF_TWO\"\n");

        let (total, collisions) =
            find_name_collisions(&[public, private, temp.path().join("missing")])
                .expect("collect");
        assert_eq!(total, 3);
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].name, "sum_of_two");
        assert_eq!(collisions[0].paths.len(), 2);
    }
}
