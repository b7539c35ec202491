use crate::error::{PollyError, Result};
use regex::{Captures, Regex};
use std::sync::OnceLock;

static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();

fn placeholder_re() -> &'static Regex {
    PLACEHOLDER_RE
        .get_or_init(|| Regex::new(r"\{\{|\}\}|\{([a-z_][a-z0-9_]*)\}").expect("static regex"))
}

/// Fill `{name}` placeholders in `template` from `fields`.
///
/// Substitution is literal; values are never re-scanned. `{{` and `}}` render
/// as single braces so instruction text can show placeholder syntax to the
/// agent. Every placeholder must have a field: a missing one fails with
/// [`PollyError::MissingTemplateField`] naming the first gap. Unused fields
/// are ignored.
pub fn render_template(template: &str, fields: &[(&str, &str)]) -> Result<String> {
    let mut missing: Option<String> = None;

    let rendered = placeholder_re().replace_all(template, |caps: &Captures| {
        let Some(name) = caps.get(1) else {
            // escaped brace
            return caps[0][..1].to_string();
        };
        match fields.iter().find(|(k, _)| *k == name.as_str()) {
            Some((_, v)) => v.to_string(),
            None => {
                if missing.is_none() {
                    missing = Some(name.as_str().to_string());
                }
                String::new()
            }
        }
    });

    match missing {
        Some(name) => Err(PollyError::MissingTemplateField(name)),
        None => Ok(rendered.into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_named_fields() {
        let out = render_template(
            "Feature {name} lives in {dir}.",
            &[("name", "cart"), ("dir", "/p/features")],
        )
        .unwrap();
        assert_eq!(out, "Feature cart lives in /p/features.");
    }

    #[test]
    fn repeated_placeholders_all_filled() {
        let out = render_template("{a}-{a}", &[("a", "x")]).unwrap();
        assert_eq!(out, "x-x");
    }

    #[test]
    fn missing_field_fails_fast() {
        let err = render_template("Hello {who}", &[]).unwrap_err();
        assert!(matches!(err, PollyError::MissingTemplateField(ref n) if n == "who"));
    }

    #[test]
    fn escaped_braces_are_literal() {
        let out = render_template("write {{slug}}.md into {dir}", &[("dir", "features")]).unwrap();
        assert_eq!(out, "write {slug}.md into features");
    }

    #[test]
    fn values_are_not_rescanned() {
        let out = render_template("{a}", &[("a", "{b}")]).unwrap();
        assert_eq!(out, "{b}");
    }

    #[test]
    fn extra_fields_are_ignored() {
        let out = render_template("plain", &[("unused", "v")]).unwrap();
        assert_eq!(out, "plain");
    }
}
