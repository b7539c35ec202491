use crate::error::Result;
use crate::paths;
use crate::phase::SentinelMatch;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_SKILLS_DIR: &str = ".claude/skills";

fn default_skills_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SKILLS_DIR)
}

// ---------------------------------------------------------------------------
// PollyConfig
// ---------------------------------------------------------------------------

/// Optional per-project settings from `.polly/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollyConfig {
    /// Model passed to the agent runtime; runtime default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Agentic turn limit per user turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<u32>,
    /// Override for the `claude` executable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claude_path: Option<String>,
    #[serde(default)]
    pub sentinel_match: SentinelMatch,
    /// Watchdog on each wait for the next agent event. No limit when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_timeout_secs: Option<u64>,
    /// Skill definitions for coordinator mode, relative to the project root.
    #[serde(default = "default_skills_dir")]
    pub skills_dir: PathBuf,
}

impl Default for PollyConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_turns: None,
            claude_path: None,
            sentinel_match: SentinelMatch::default(),
            turn_timeout_secs: None,
            skills_dir: default_skills_dir(),
        }
    }
}

impl PollyConfig {
    /// Load from `root`, falling back to defaults when the file is absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: PollyConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn skills_dir(&self, root: &Path) -> PathBuf {
        if self.skills_dir.is_absolute() {
            self.skills_dir.clone()
        } else {
            root.join(&self.skills_dir)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
