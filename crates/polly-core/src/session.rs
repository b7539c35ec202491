use crate::paths::ProjectLayout;
use std::path::{Path, PathBuf};

pub const WRITE_TOOL: &str = "Write";

/// Transient bookkeeping for one phase run.
///
/// Collects the agent's text across turns and every file it wrote, singling
/// out writes under `future-features/`. Capture is decided by path prefix
/// only; file contents are never inspected.
#[derive(Debug)]
pub struct PhaseSession {
    layout: ProjectLayout,
    transcript: String,
    written: Vec<PathBuf>,
    future_features: Vec<PathBuf>,
}

impl PhaseSession {
    pub fn new(layout: ProjectLayout) -> Self {
        Self {
            layout,
            transcript: String::new(),
            written: Vec::new(),
            future_features: Vec::new(),
        }
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn push_text(&mut self, text: &str) {
        if !self.transcript.is_empty() && !self.transcript.ends_with('\n') {
            self.transcript.push('\n');
        }
        self.transcript.push_str(text);
    }

    /// Record a tool invocation. Returns the captured path when the call was
    /// a future-feature write.
    pub fn record_tool_use(&mut self, name: &str, input: &serde_json::Value) -> Option<PathBuf> {
        if name != WRITE_TOOL {
            return None;
        }
        let raw = input.get("file_path").and_then(|v| v.as_str())?;
        let path = self.layout.resolve(Path::new(raw));
        if !self.written.contains(&path) {
            self.written.push(path.clone());
        }
        if !self.layout.is_future_feature(&path) {
            return None;
        }
        if self.future_features.contains(&path) {
            return None;
        }
        tracing::info!(path = %path.display(), "captured future feature");
        self.future_features.push(path.clone());
        Some(path)
    }

    /// Slug of the last feature summary written this phase, if any.
    pub fn written_summary_slug(&self) -> Option<String> {
        self.written
            .iter()
            .rev()
            .find_map(|p| self.layout.summary_slug(p))
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn future_features(&self) -> &[PathBuf] {
        &self.future_features
    }

    pub fn into_parts(self) -> (String, Vec<PathBuf>, Vec<PathBuf>) {
        (self.transcript, self.written, self.future_features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session() -> PhaseSession {
        PhaseSession::new(ProjectLayout::new("/proj"))
    }

    #[test]
    fn write_under_future_features_is_captured() {
        let mut s = session();
        let got = s.record_tool_use(
            "Write",
            &json!({"file_path": "/proj/future-features/dark-mode.md", "content": "x"}),
        );
        assert_eq!(got, Some(PathBuf::from("/proj/future-features/dark-mode.md")));
        assert_eq!(s.future_features().len(), 1);
        assert_eq!(s.written().len(), 1);
    }

    #[test]
    fn relative_paths_resolve_against_root() {
        let mut s = session();
        let got = s.record_tool_use("Write", &json!({"file_path": "future-features/a.md"}));
        assert_eq!(got, Some(PathBuf::from("/proj/future-features/a.md")));
    }

    #[test]
    fn content_mentioning_future_features_is_not_captured() {
        let mut s = session();
        let got = s.record_tool_use(
            "Write",
            &json!({"file_path": "/proj/features/cart.md", "content": "see future-features/"}),
        );
        assert_eq!(got, None);
        assert!(s.future_features().is_empty());
        assert_eq!(s.written_summary_slug(), Some("cart".into()));
    }

    #[test]
    fn other_tools_are_ignored() {
        let mut s = session();
        for tool in ["Read", "Glob", "Grep", "Edit"] {
            assert_eq!(
                s.record_tool_use(tool, &json!({"file_path": "/proj/future-features/a.md"})),
                None
            );
        }
        assert!(s.written().is_empty());
    }

    #[test]
    fn duplicate_writes_recorded_once() {
        let mut s = session();
        let input = json!({"file_path": "/proj/future-features/a.md"});
        assert!(s.record_tool_use("Write", &input).is_some());
        assert!(s.record_tool_use("Write", &input).is_none());
        assert_eq!(s.future_features().len(), 1);
    }

    #[test]
    fn transcript_joins_segments_with_newlines() {
        let mut s = session();
        s.push_text("first");
        s.push_text("second");
        assert_eq!(s.transcript(), "first\nsecond");
    }

    #[test]
    fn increments_write_is_not_a_summary() {
        let mut s = session();
        s.record_tool_use("Write", &json!({"file_path": "/proj/features/cart.md"}));
        s.record_tool_use("Write", &json!({"file_path": "/proj/features/cart_increments.md"}));
        assert_eq!(s.written_summary_slug(), Some("cart".into()));
    }
}
