//! Feature-completion inspection.
//!
//! A feature is complete when three artifacts exist: its summary, its
//! increments document and a prompts directory holding at least one
//! `increment_NN_*.md` file. Checks always run in that order.

use crate::error::Result;
use crate::paths::{self, ProjectLayout, INCREMENTS_SUFFIX, MARKDOWN_EXT};
use crate::phase::Phase;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// FeatureStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureStatus {
    MissingIncrements,
    MissingPrompts,
}

impl FeatureStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FeatureStatus::MissingIncrements => "missing increments",
            FeatureStatus::MissingPrompts => "missing prompts",
        }
    }
}

impl fmt::Display for FeatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncompleteFeature {
    pub slug: String,
    pub status: FeatureStatus,
}

// ---------------------------------------------------------------------------
// Inspection
// ---------------------------------------------------------------------------

/// Slugs of every feature summary in `features_dir`, sorted.
///
/// Any `*.md` whose stem does not end in `_increments` counts as a summary.
/// A missing directory yields no summaries.
pub fn summary_slugs(features_dir: &Path) -> Result<Vec<String>> {
    if !features_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut slugs = Vec::new();
    for entry in std::fs::read_dir(features_dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(MARKDOWN_EXT) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if stem.ends_with(INCREMENTS_SUFFIX) {
            continue;
        }
        slugs.push(stem.to_string());
    }
    slugs.sort();
    Ok(slugs)
}

/// Prompt files for `slug`, ordered by their embedded increment index.
pub fn prompt_files(prompts_dir: &Path, slug: &str) -> Result<Vec<PathBuf>> {
    let dir = prompts_dir.join(slug);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files: Vec<(u32, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(&dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let index = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(paths::prompt_file_index);
        if let Some(index) = index {
            files.push((index, path));
        }
    }
    files.sort();
    Ok(files.into_iter().map(|(_, p)| p).collect())
}

/// Status of a single feature, or `None` if it is complete.
pub fn feature_status(layout: &ProjectLayout, slug: &str) -> Result<Option<FeatureStatus>> {
    if !layout.increments_path(slug).is_file() {
        return Ok(Some(FeatureStatus::MissingIncrements));
    }
    if prompt_files(&layout.prompts, slug)?.is_empty() {
        return Ok(Some(FeatureStatus::MissingPrompts));
    }
    Ok(None)
}

/// Every feature in `features_dir` that still lacks an artifact, by slug.
pub fn list_incomplete(features_dir: &Path) -> Result<Vec<IncompleteFeature>> {
    let layout = ProjectLayout::from_features_dir(features_dir);
    let mut out = Vec::new();
    for slug in summary_slugs(features_dir)? {
        if let Some(status) = feature_status(&layout, &slug)? {
            out.push(IncompleteFeature { slug, status });
        }
    }
    Ok(out)
}

/// The phase a feature should re-enter.
///
/// Discovery without a summary, grouping without increments, generation
/// otherwise. Generation re-derives prompts from the increments document, so a
/// finished feature resumes there too.
pub fn resume_phase(features_dir: &Path, slug: &str) -> Phase {
    let layout = ProjectLayout::from_features_dir(features_dir);
    if !layout.summary_path(slug).is_file() {
        Phase::Discovery
    } else if !layout.increments_path(slug).is_file() {
        Phase::Grouping
    } else {
        Phase::Generation
    }
}

// ---------------------------------------------------------------------------
// FeatureArtifacts
// ---------------------------------------------------------------------------

/// What exists on disk for one feature; used for end-of-feature reports.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureArtifacts {
    pub summary: Option<PathBuf>,
    pub increments: Option<PathBuf>,
    pub prompts: Vec<PathBuf>,
}

impl FeatureArtifacts {
    pub fn inspect(layout: &ProjectLayout, slug: &str) -> Result<Self> {
        let summary = Some(layout.summary_path(slug)).filter(|p| p.is_file());
        let increments = Some(layout.increments_path(slug)).filter(|p| p.is_file());
        Ok(Self {
            summary,
            increments,
            prompts: prompt_files(&layout.prompts, slug)?,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.summary.is_some() && self.increments.is_some() && !self.prompts.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
