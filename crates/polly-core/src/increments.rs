//! Parsing of a feature's increments document.
//!
//! The document is free markdown; only the structure Polly asks the agent
//! to produce is read back:
//!
//! ```text
//! ## Increment 1: Login Form
//! **User Value**: Users can sign in.
//! **Scope**: Form, handler, session cookie.
//! **Dependencies**: None
//! ```

use crate::paths::prompt_filename;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Increment {
    pub number: u32,
    pub name: String,
    pub user_value: String,
    pub scope: String,
    pub dependencies: Vec<u32>,
}

impl Increment {
    pub fn prompt_filename(&self) -> String {
        prompt_filename(self.number, &self.name)
    }
}

static HEADING_RE: OnceLock<Regex> = OnceLock::new();
static FIELD_RE: OnceLock<Regex> = OnceLock::new();
static DEP_RE: OnceLock<Regex> = OnceLock::new();

fn heading_re() -> &'static Regex {
    HEADING_RE.get_or_init(|| {
        Regex::new(r"(?i)^#{2,3}\s*Increment\s+(\d+)\s*[:\-–]\s*(.+?)\s*$").expect("static regex")
    })
}

fn field_re() -> &'static Regex {
    FIELD_RE.get_or_init(|| {
        Regex::new(r"(?i)^[-*\s]*\*\*(User Value|Scope|Dependencies)\*\*\s*:?\s*(.*)$")
            .expect("static regex")
    })
}

fn dep_re() -> &'static Regex {
    DEP_RE.get_or_init(|| Regex::new(r"(?i)increment\s+(\d+)").expect("static regex"))
}

/// Increments in document order.
pub fn parse_increments(text: &str) -> Vec<Increment> {
    let mut out: Vec<Increment> = Vec::new();

    for line in text.lines() {
        if let Some(caps) = heading_re().captures(line) {
            let Ok(number) = caps[1].parse() else {
                continue;
            };
            out.push(Increment {
                number,
                name: caps[2].trim().to_string(),
                user_value: String::new(),
                scope: String::new(),
                dependencies: Vec::new(),
            });
            continue;
        }
        let Some(current) = out.last_mut() else {
            continue;
        };
        let Some(caps) = field_re().captures(line) else {
            continue;
        };
        let value = caps[2].trim();
        match caps[1].to_ascii_lowercase().as_str() {
            "user value" => current.user_value = value.to_string(),
            "scope" => current.scope = value.to_string(),
            _ => {
                current.dependencies = dep_re()
                    .captures_iter(value)
                    .filter_map(|c| c[1].parse().ok())
                    .collect();
            }
        }
    }

    out
}

/// Problems with ordering: numbers out of sequence, or dependencies that
/// point at the same or a later increment.
pub fn ordering_warnings(increments: &[Increment]) -> Vec<String> {
    let mut warnings = Vec::new();
    for (i, inc) in increments.iter().enumerate() {
        let expected = i as u32 + 1;
        if inc.number != expected {
            warnings.push(format!(
                "increment '{}' is numbered {} but appears in position {}",
                inc.name, inc.number, expected
            ));
        }
        for dep in &inc.dependencies {
            if *dep >= inc.number {
                warnings.push(format!(
                    "increment {} depends on increment {}, which does not come before it",
                    inc.number, dep
                ));
            }
        }
    }
    warnings
}
