use crate::error::{PollyError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const SKILL_FILE: &str = "SKILL.md";

/// Name and description from a `SKILL.md` frontmatter block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillMeta {
    pub name: String,
    pub description: String,
    /// Path relative to the skills directory's parent, e.g. `skills/x/SKILL.md`.
    pub path: PathBuf,
}

#[derive(Deserialize)]
struct Frontmatter {
    name: Option<String>,
    description: Option<String>,
}

static FRONTMATTER_RE: OnceLock<Regex> = OnceLock::new();

fn frontmatter_re() -> &'static Regex {
    FRONTMATTER_RE.get_or_init(|| Regex::new(r"(?s)\A---\s*\n(.*?)\n---\s*\n").expect("static regex"))
}

static FIELD_LINE_RE: OnceLock<Regex> = OnceLock::new();

fn field_line_re() -> &'static Regex {
    FIELD_LINE_RE.get_or_init(|| {
        Regex::new(r"(?m)^(name|description):[ \t]*(.+?)[ \t]*$").expect("static regex")
    })
}

/// `key: value` lines taken literally, for frontmatter that is not valid
/// YAML (unquoted values containing `": "` are common in skill descriptions).
fn scan_fields(frontmatter: &str) -> Frontmatter {
    let mut fm = Frontmatter {
        name: None,
        description: None,
    };
    for caps in field_line_re().captures_iter(frontmatter) {
        let slot = match &caps[1] {
            "name" => &mut fm.name,
            _ => &mut fm.description,
        };
        if slot.is_none() {
            *slot = Some(caps[2].to_string());
        }
    }
    fm
}

fn parse_skill(content: &str, path: &Path) -> Result<(String, String)> {
    let malformed = |reason: &str| PollyError::MalformedSkill {
        path: path.display().to_string(),
        reason: reason.to_string(),
    };
    let caps = frontmatter_re()
        .captures(content)
        .ok_or_else(|| malformed("no frontmatter"))?;
    let fm = match serde_yaml::from_str::<Frontmatter>(&caps[1]) {
        Ok(fm) => fm,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "frontmatter is not YAML, reading lines");
            scan_fields(&caps[1])
        }
    };
    let name = fm
        .name
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| malformed("missing name"))?;
    let description = fm
        .description
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| malformed("missing description"))?;
    Ok((name, description))
}

/// Metadata for every `*/SKILL.md` under `skills_dir`, sorted by name.
///
/// Unreadable or malformed skills are skipped with a warning; a missing
/// directory yields an empty list.
pub fn load_skill_metadata(skills_dir: &Path) -> Vec<SkillMeta> {
    let Ok(entries) = std::fs::read_dir(skills_dir) else {
        return Vec::new();
    };
    let base = skills_dir.parent().unwrap_or(skills_dir);

    let mut skills = Vec::new();
    for entry in entries.flatten() {
        let skill_md = entry.path().join(SKILL_FILE);
        if !skill_md.is_file() {
            continue;
        }
        let parsed = std::fs::read_to_string(&skill_md)
            .map_err(PollyError::from)
            .and_then(|c| parse_skill(&c, &skill_md));
        match parsed {
            Ok((name, description)) => skills.push(SkillMeta {
                name,
                description,
                path: skill_md
                    .strip_prefix(base)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| skill_md.clone()),
            }),
            Err(e) => {
                tracing::warn!(path = %skill_md.display(), error = %e, "skipping skill");
            }
        }
    }
    skills.sort_by(|a, b| a.name.cmp(&b.name));
    skills
}

pub fn format_skills_metadata(skills: &[SkillMeta]) -> String {
    if skills.is_empty() {
        return "No skills available.".to_string();
    }
    skills
        .iter()
        .map(|s| format!("**{}**: {}", s.name, s.description))
        .collect::<Vec<_>>()
        .join("\n")
}
