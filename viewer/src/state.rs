//! Shared application state for the viewer.

use std::path::PathBuf;

/// Shared state accessible from all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Root of the artifact tree written by `builder build`.
    pub release_dir: PathBuf,
}

impl AppState {
    pub fn new(release_dir: PathBuf) -> Self {
        Self { release_dir }
    }

    /// Location of one artifact, or `None` when a component could escape the release dir.
    pub fn artifact_path(&self, level: &str, tag: &str, name: &str) -> Option<PathBuf> {
        let safe = |part: &str| {
            !part.is_empty() && part != "." && part != ".." && !part.contains(['/', '\\'])
        };
        if !(safe(level) && safe(tag) && safe(name)) {
            return None;
        }
        Some(
            self.release_dir
                .join(level)
                .join(tag)
                .join(format!("{name}.json")),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_path_rejects_traversal() {
        let state = AppState::new(PathBuf::from("release"));
        assert_eq!(
            state.artifact_path("easy", "math", "sum"),
            Some(PathBuf::from("release/easy/math/sum.json"))
        );
        assert!(state.artifact_path("..", "math", "sum").is_none());
        assert!(state.artifact_path("easy", "a\\b", "sum").is_none());
        assert!(state.artifact_path("easy", "math", "").is_none());
    }
}
