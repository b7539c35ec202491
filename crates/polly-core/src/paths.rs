use crate::slug::slugify;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const FEATURES_DIR: &str = "features";
pub const FUTURE_FEATURES_DIR: &str = "future-features";
pub const PROMPTS_DIR: &str = "prompts";

pub const POLLY_DIR: &str = ".polly";
pub const CONFIG_FILE: &str = ".polly/config.yaml";

pub const INCREMENTS_SUFFIX: &str = "_increments";
pub const MARKDOWN_EXT: &str = "md";

// ---------------------------------------------------------------------------
// ProjectLayout
// ---------------------------------------------------------------------------

/// The three conventional directories of a project.
///
/// `future-features/` and `prompts/` are always siblings of `features/`, so a
/// layout can be rebuilt from the features directory alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub features: PathBuf,
    pub future_features: PathBuf,
    pub prompts: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            features: root.join(FEATURES_DIR),
            future_features: root.join(FUTURE_FEATURES_DIR),
            prompts: root.join(PROMPTS_DIR),
            root,
        }
    }

    /// Derive the layout from a features directory, using its parent as root.
    pub fn from_features_dir(features_dir: &Path) -> Self {
        let root = features_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            features: features_dir.to_path_buf(),
            future_features: root.join(FUTURE_FEATURES_DIR),
            prompts: root.join(PROMPTS_DIR),
            root,
        }
    }

    pub fn summary_path(&self, slug: &str) -> PathBuf {
        self.features.join(format!("{slug}.{MARKDOWN_EXT}"))
    }

    pub fn increments_path(&self, slug: &str) -> PathBuf {
        self.features
            .join(format!("{slug}{INCREMENTS_SUFFIX}.{MARKDOWN_EXT}"))
    }

    pub fn feature_prompts_dir(&self, slug: &str) -> PathBuf {
        self.prompts.join(slug)
    }

    pub fn stub_path(&self, slug: &str) -> PathBuf {
        self.future_features.join(format!("{slug}.{MARKDOWN_EXT}"))
    }

    /// Resolve a path reported by the agent against the project root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn is_future_feature(&self, path: &Path) -> bool {
        self.resolve(path).starts_with(&self.future_features)
    }

    /// Slug of a feature summary written under `features/`, if `path` is one.
    pub fn summary_slug(&self, path: &Path) -> Option<String> {
        let path = self.resolve(path);
        if path.parent()? != self.features {
            return None;
        }
        if path.extension()? != MARKDOWN_EXT {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        if stem.ends_with(INCREMENTS_SUFFIX) {
            return None;
        }
        Some(stem.to_string())
    }

    pub fn config_path(&self) -> PathBuf {
        config_path(&self.root)
    }
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

// ---------------------------------------------------------------------------
// Prompt filenames
// ---------------------------------------------------------------------------

/// `increment_NN_<slug>.md`, one-indexed and zero-padded to two digits.
pub fn prompt_filename(index: u32, increment_name: &str) -> String {
    format!("increment_{index:02}_{}.{MARKDOWN_EXT}", slugify(increment_name))
}

static PROMPT_FILE_RE: OnceLock<Regex> = OnceLock::new();

fn prompt_file_re() -> &'static Regex {
    PROMPT_FILE_RE.get_or_init(|| Regex::new(r"^increment_(\d+)(_.*)?\.md$").expect("static regex"))
}

/// Increment index embedded in a prompt filename, if it follows the pattern.
pub fn prompt_file_index(file_name: &str) -> Option<u32> {
    prompt_file_re()
        .captures(file_name)
        .and_then(|c| c[1].parse().ok())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
