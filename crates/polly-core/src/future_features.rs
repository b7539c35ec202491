use crate::error::Result;
use crate::paths::MARKDOWN_EXT;
use crate::template::render_template;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

pub const STUB_TEMPLATE: &str = "# Future Feature: {feature_name}

**Status**: Placeholder for future planning

## Brief Description
{description}

## Mentioned In Context
This feature was mentioned during the discovery phase for: **{mentioned_in_feature}**

**Date Captured**: {capture_date}

## Initial Notes
{initial_notes}

---
*This is a placeholder document created by Polly.*
*Pick \"Expand a future-feature stub\" from the menu when you're ready to develop it.*
";

pub const DEFAULT_NOTES: &str = "No additional notes.";

#[derive(Debug, Clone)]
pub struct StubFields<'a> {
    pub feature_name: &'a str,
    pub description: &'a str,
    pub mentioned_in_feature: &'a str,
    pub initial_notes: &'a str,
}

pub fn render_stub(fields: &StubFields<'_>, captured_at: DateTime<Local>) -> Result<String> {
    let capture_date = captured_at.format("%Y-%m-%d %H:%M:%S").to_string();
    render_template(
        STUB_TEMPLATE,
        &[
            ("feature_name", fields.feature_name),
            ("description", fields.description),
            ("mentioned_in_feature", fields.mentioned_in_feature),
            ("capture_date", &capture_date),
            ("initial_notes", fields.initial_notes),
        ],
    )
}

/// The stub format handed to the agent, with angle-bracket markers where it
/// must fill in details and today's timestamp already set.
pub fn stub_format_guide(now: DateTime<Local>) -> Result<String> {
    let notes = format!("<any extra context from the conversation, or \"{DEFAULT_NOTES}\">");
    render_stub(
        &StubFields {
            feature_name: "<Feature Name>",
            description: "<1-2 sentence description>",
            mentioned_in_feature: "<feature being discussed>",
            initial_notes: &notes,
        },
        now,
    )
}

// ---------------------------------------------------------------------------
// Stub listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubEntry {
    pub slug: String,
    pub path: PathBuf,
}

/// Markdown files in the future-features directory, sorted by slug.
pub fn list_stubs(future_features_dir: &Path) -> Result<Vec<StubEntry>> {
    if !future_features_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut stubs = Vec::new();
    for entry in std::fs::read_dir(future_features_dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(MARKDOWN_EXT) {
            continue;
        }
        if let Some(slug) = path.file_stem().and_then(|s| s.to_str()) {
            stubs.push(StubEntry {
                slug: slug.to_string(),
                path: path.clone(),
            });
        }
    }
    stubs.sort_by(|a, b| a.slug.cmp(&b.slug));
    Ok(stubs)
}

/// Full stub text, verbatim.
pub fn read_stub(entry: &StubEntry) -> Result<String> {
    Ok(std::fs::read_to_string(&entry.path)?)
}

/// The `# Future Feature: <name>` title of a stub, if present.
pub fn stub_title(content: &str) -> Option<&str> {
    content
        .lines()
        .find_map(|l| l.strip_prefix("# Future Feature:"))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
