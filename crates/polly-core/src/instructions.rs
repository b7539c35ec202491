//! Instruction text handed to the agent at the start of each phase.
//!
//! Each phase has a fixed template; the variable parts (paths, prior context,
//! captured stubs, the feature being worked on) are injected through
//! [`render_template`], so a placeholder without a value is a bug caught at
//! render time rather than text leaked to the model.

use crate::error::{PollyError, Result};
use crate::increments::Increment;
use crate::paths::ProjectLayout;
use crate::phase::Phase;
use crate::template::render_template;
use std::path::PathBuf;

pub const PHASE_0_TEMPLATE: &str = "You are Polly, helping a user break features down into incremental coding prompts.

# Phase 0: Context Gathering

Your task is to understand the feature documentation that already exists for this project before any new feature is discussed.

1. Use the Glob tool to search for markdown files (`**/*.md`) in: {features_directory}
2. Use the Read tool to read each feature documentation file you find.
3. Summarize what you learned: the features that exist, their relationships, and any gaps you noticed.
4. If no files exist, say so plainly; this is a new project and that is fine.

Keep the summary short and factual. Do not invent features.

When the summary is done and the user has nothing to add, tell them you are ready to move on to Phase 1: Discovery, and end your message with the exact token {sentinel} on its own line.
";

pub const PHASE_1_TEMPLATE: &str = "You are Polly, helping a user define one feature in detail.

# Phase 1: Discovery

{context_section}{seed_section}Interview the user about the feature. Ask at least 5 clarifying questions, one or two at a time, covering:
- the problem being solved
- the target users
- key functionality
- technical constraints
- dependencies on other features or systems
- expected behavior, including edge cases

When you understand the feature, use the Write tool to save a feature summary at `{features_directory}/{{slug}}.md`, where `{{slug}}` is the feature name in lowercase with spaces and underscores replaced by hyphens. The feature summary must have these sections:

- Feature Name
- Problem Statement
- Target Users
- Key Functionality
- Technical Constraints
- Dependencies
- Expected Behavior
- Open Questions

{future_section}After the summary is written, end your message with the exact token {sentinel} on its own line.
";

pub const PHASE_2_TEMPLATE: &str = "You are Polly, helping a user plan how to build a feature incrementally.

# Phase 2: Incremental Grouping

{context_section}The feature summary is at `{summary_path}`. Read it first.

Break the feature into increments. Each increment must be a vertical slice: it delivers value a user can see, cuts through every layer it needs, and can be tested on its own. Order them so that every increment depends only on increments before it.

Propose the increments to the user and refine them together. When the user approves, use the Write tool to save them to `{increments_path}` in exactly this structure:

```
## Increment 1: <Name>
**User Value**: <what the user can do after this increment>
**Scope**: <what is built>
**Dependencies**: None

## Increment 2: <Name>
**User Value**: ...
**Scope**: ...
**Dependencies**: Increment 1
```

{future_section}After the increments file is written, end your message with the exact token {sentinel} on its own line.
";

pub const PHASE_3_TEMPLATE: &str = "You are Polly, turning an increment plan into coding prompts.

# Phase 3: Prompt Generation

{context_section}Read the feature summary at `{summary_path}` and the increments at `{increments_path}`.

For each increment, in order, use the Write tool to create one detailed coding prompt in `{feature_prompts_dir}`. Each prompt should give a coding assistant everything it needs: the goal, the user value, the scope, files or components likely to change, acceptance criteria and how to test the slice. Refer back to earlier increments where this one builds on them.

Use these file names:
{increment_files}

If a file already exists, overwrite it with an up-to-date version.

After every prompt is written, give the user a one-line summary per file and end your message with the exact token {sentinel} on its own line.
";

pub const IDENTIFICATION_TEMPLATE: &str = "You are Polly, helping a user map out every feature of an application.

# Feature Identification

{context_section}Ask the user to describe the application. Then identify its features. Each feature must be a discrete, testable vertical slice of functionality. Discuss the list with the user and adjust it until they are happy.

For every agreed feature that does not already have a file, use the Write tool to create a stub in `{future_features_directory}/{{slug}}.md`, where `{{slug}}` is the feature name in lowercase with spaces and underscores replaced by hyphens. Use this format:

{stub_format}

After all stubs are written, list them for the user and end your message with the exact token {sentinel} on its own line.
";

pub const COORDINATOR_TEMPLATE: &str = "You are Polly, a terminal-based AI agent that helps users define features and transform high-level feature descriptions into detailed, incremental coding prompts.

## Your Core Purpose

You help product managers, technical leads and developers break complex features into implementable vertical slices, guiding them through a structured workflow while keeping the conversation natural.

## Available Skills

Skills are located in: `{skills_directory}`

{skills_metadata}

When a skill is relevant, use the Read tool on `{skills_directory}/<skill-name>/SKILL.md` and follow its instructions. Skills may reference template files in their own directory.

## Project Structure

```
{project_directory}/
├── features/          # Detailed feature descriptions
├── future-features/   # Feature stubs for future planning
└── prompts/           # Generated coding prompts, one folder per feature
```

- Features: `{features_directory}`
- Future features: `{future_features_directory}`
- Prompts: `{prompts_directory}`

## Conversational Interaction Style

- Explore the project first with Glob and Read, summarize what exists, and suggest a next step.
- Ask 1-2 questions at a time.
- Explain what you are about to do before using a tool.
- No greetings and no decorative boxes; the terminal handles formatting.
- Increments must always be vertical slices that deliver user value and can be tested on their own.
";

// ---------------------------------------------------------------------------
// InstructionContext
// ---------------------------------------------------------------------------

/// Everything the orchestrator has accumulated that a phase may need.
#[derive(Debug, Clone, Default)]
pub struct InstructionContext<'a> {
    /// Text produced during context gathering.
    pub project_context: Option<&'a str>,
    /// Future-feature stubs captured so far in this session.
    pub future_features: &'a [PathBuf],
    /// Slug of the feature being worked on (grouping and generation).
    pub feature_slug: Option<&'a str>,
    /// Stub text used to seed discovery, verbatim.
    pub seed: Option<&'a str>,
    /// Parsed increments, for generation.
    pub increments: &'a [Increment],
    /// Stub format shown to the agent.
    pub stub_format: Option<&'a str>,
    /// Formatted skill list and its directory, for the coordinator.
    pub skills_metadata: Option<&'a str>,
    pub skills_directory: Option<&'a str>,
}

fn context_section(ctx: &InstructionContext<'_>) -> String {
    match ctx.project_context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(c) => format!("## Existing Project Context\n\n{c}\n\n"),
        None => String::new(),
    }
}

fn seed_section(ctx: &InstructionContext<'_>) -> String {
    match ctx.seed {
        Some(seed) => format!(
            "## Starting Point\n\nThe user wants to expand this future-feature stub into a full feature. Use it as the starting point for your questions:\n\n{seed}\n\n"
        ),
        None => String::new(),
    }
}

fn future_section(ctx: &InstructionContext<'_>, layout: &ProjectLayout) -> String {
    let dir = layout.future_features.display();
    let mut out = format!(
        "If the conversation surfaces work that is out of scope for this feature, do not fold it in. Instead use the Write tool to capture it as a stub in `{dir}/{{slug}}.md`.\n\n"
    );
    if let Some(format) = ctx.stub_format {
        out.push_str("Stub format:\n\n");
        out.push_str(format);
        out.push('\n');
    }
    if !ctx.future_features.is_empty() {
        out.push_str("Stubs already captured this session (do not duplicate them):\n");
        for p in ctx.future_features {
            out.push_str(&format!("- {}\n", p.display()));
        }
        out.push('\n');
    }
    out
}

fn increment_files(ctx: &InstructionContext<'_>) -> String {
    if ctx.increments.is_empty() {
        return "- `increment_NN_<increment-slug>.md`, with NN the two-digit increment number starting at 01".to_string();
    }
    ctx.increments
        .iter()
        .map(|i| format!("- `{}` for Increment {}: {}", i.prompt_filename(), i.number, i.name))
        .collect::<Vec<_>>()
        .join("\n")
}

fn require<'a>(value: Option<&'a str>, artifact: &str, phase: Phase) -> Result<&'a str> {
    value.ok_or_else(|| PollyError::MissingPrerequisite {
        artifact: artifact.to_string(),
        phase: phase.to_string(),
    })
}

/// Render the opening instruction for `phase`.
pub fn build_instruction(
    phase: Phase,
    layout: &ProjectLayout,
    ctx: &InstructionContext<'_>,
) -> Result<String> {
    let sentinel = phase.sentinel_token().unwrap_or_default();
    let features_directory = layout.features.display().to_string();
    let future_features_directory = layout.future_features.display().to_string();

    match phase {
        Phase::ContextGathering => render_template(
            PHASE_0_TEMPLATE,
            &[
                ("features_directory", &features_directory),
                ("sentinel", sentinel),
            ],
        ),
        Phase::Discovery => {
            let context_section = context_section(ctx);
            let seed_section = seed_section(ctx);
            let future_section = future_section(ctx, layout);
            render_template(
                PHASE_1_TEMPLATE,
                &[
                    ("context_section", &context_section),
                    ("seed_section", &seed_section),
                    ("features_directory", &features_directory),
                    ("future_section", &future_section),
                    ("sentinel", sentinel),
                ],
            )
        }
        Phase::Grouping | Phase::Generation => {
            let slug = require(ctx.feature_slug, "feature slug", phase)?;
            let context_section = context_section(ctx);
            let summary_path = layout.summary_path(slug).display().to_string();
            let increments_path = layout.increments_path(slug).display().to_string();
            if phase == Phase::Grouping {
                let future_section = future_section(ctx, layout);
                render_template(
                    PHASE_2_TEMPLATE,
                    &[
                        ("context_section", &context_section),
                        ("summary_path", &summary_path),
                        ("increments_path", &increments_path),
                        ("future_section", &future_section),
                        ("sentinel", sentinel),
                    ],
                )
            } else {
                let feature_prompts_dir = layout.feature_prompts_dir(slug).display().to_string();
                let increment_files = increment_files(ctx);
                render_template(
                    PHASE_3_TEMPLATE,
                    &[
                        ("context_section", &context_section),
                        ("summary_path", &summary_path),
                        ("increments_path", &increments_path),
                        ("feature_prompts_dir", &feature_prompts_dir),
                        ("increment_files", &increment_files),
                        ("sentinel", sentinel),
                    ],
                )
            }
        }
        Phase::Identification => {
            let context_section = context_section(ctx);
            let stub_format = require(ctx.stub_format, "stub format", phase)?;
            render_template(
                IDENTIFICATION_TEMPLATE,
                &[
                    ("context_section", &context_section),
                    ("future_features_directory", &future_features_directory),
                    ("stub_format", stub_format),
                    ("sentinel", sentinel),
                ],
            )
        }
        Phase::Coordinator => {
            let project_directory = layout.root.display().to_string();
            let prompts_directory = layout.prompts.display().to_string();
            render_template(
                COORDINATOR_TEMPLATE,
                &[
                    ("project_directory", &project_directory),
                    ("features_directory", &features_directory),
                    ("future_features_directory", &future_features_directory),
                    ("prompts_directory", &prompts_directory),
                    (
                        "skills_directory",
                        require(ctx.skills_directory, "skills directory", phase)?,
                    ),
                    (
                        "skills_metadata",
                        ctx.skills_metadata.unwrap_or("No skills available."),
                    ),
                ],
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::increments::parse_increments;

    fn layout() -> ProjectLayout {
        ProjectLayout::new("/test/project")
    }

    #[test]
    fn phase_0_mentions_tools_and_sentinel() {
        let out = build_instruction(Phase::ContextGathering, &layout(), &Default::default()).unwrap();
        assert!(out.contains("Phase 0"));
        assert!(out.contains("Context Gathering"));
        assert!(out.contains("Glob"));
        assert!(out.contains("Read"));
        assert!(out.to_lowercase().contains("feature documentation"));
        assert!(out.to_lowercase().contains("summarize"));
        assert!(out.contains("Phase 1: Discovery"));
        assert!(out.contains("PHASE_0_COMPLETE"));
        assert!(out.contains("/test/project/features"));
    }

    #[test]
    fn phase_1_lists_summary_sections_and_slug_rule() {
        let out = build_instruction(Phase::Discovery, &layout(), &Default::default()).unwrap();
        for section in [
            "Feature Name",
            "Problem Statement",
            "Target Users",
            "Key Functionality",
            "Technical Constraints",
            "Dependencies",
            "Expected Behavior",
        ] {
            assert!(out.contains(section), "missing {section}");
        }
        assert!(out.contains("at least 5 clarifying questions"));
        assert!(out.contains("{slug}.md"));
        assert!(out.contains("lowercase"));
        assert!(out.contains("hyphens"));
        assert!(out.contains("PHASE_1_COMPLETE"));
        assert!(out.contains("/test/project/future-features"));
    }

    #[test]
    fn stub_seed_is_injected_verbatim() {
        let stub = "# Future Feature: Export\n\n## Brief Description\nCSV export.\n".repeat(30);
        let ctx = InstructionContext {
            seed: Some(&stub),
            ..Default::default()
        };
        let out = build_instruction(Phase::Discovery, &layout(), &ctx).unwrap();
        assert!(out.contains(&stub));
    }

    #[test]
    fn context_and_captured_stubs_flow_forward() {
        let captured = vec![PathBuf::from("/test/project/future-features/dark-mode.md")];
        let ctx = InstructionContext {
            project_context: Some("Two features exist: auth and cart."),
            future_features: &captured,
            feature_slug: Some("cart"),
            ..Default::default()
        };
        let out = build_instruction(Phase::Grouping, &layout(), &ctx).unwrap();
        assert!(out.contains("Two features exist: auth and cart."));
        assert!(out.contains("/test/project/future-features/dark-mode.md"));
        assert!(out.contains("/test/project/features/cart_increments.md"));
        assert!(out.contains("PHASE_2_COMPLETE"));
    }

    #[test]
    fn grouping_without_slug_is_missing_prerequisite() {
        let err = build_instruction(Phase::Grouping, &layout(), &Default::default()).unwrap_err();
        assert!(matches!(err, PollyError::MissingPrerequisite { .. }));
    }

    #[test]
    fn generation_lists_expected_filenames() {
        let incs = parse_increments("## Increment 1: Login Form\n## Increment 2: Logout\n");
        let ctx = InstructionContext {
            feature_slug: Some("auth"),
            increments: &incs,
            ..Default::default()
        };
        let out = build_instruction(Phase::Generation, &layout(), &ctx).unwrap();
        assert!(out.contains("increment_01_login-form.md"));
        assert!(out.contains("increment_02_logout.md"));
        assert!(out.contains("/test/project/prompts/auth"));
        assert!(out.contains("PHASE_3_COMPLETE"));
    }

    #[test]
    fn coordinator_has_no_unreplaced_placeholders() {
        let ctx = InstructionContext {
            skills_directory: Some("/skills"),
            skills_metadata: Some("**test-skill**: A test skill"),
            ..Default::default()
        };
        let out = build_instruction(Phase::Coordinator, &layout(), &ctx).unwrap();
        assert!(out.contains("You are Polly"));
        assert!(out.contains("Core Purpose"));
        assert!(out.contains("Available Skills"));
        assert!(out.contains("Project Structure"));
        assert!(out.contains("Conversational Interaction Style"));
        assert!(out.contains("/test/project/prompts"));
        assert!(out.contains("**test-skill**"));
        for p in [
            "{project_directory}",
            "{features_directory}",
            "{future_features_directory}",
            "{prompts_directory}",
            "{skills_directory}",
            "{skills_metadata}",
        ] {
            assert!(!out.contains(p), "unreplaced {p}");
        }
    }

    #[test]
    fn identification_uses_stub_format() {
        let ctx = InstructionContext {
            stub_format: Some("# Future Feature: <Feature Name>"),
            ..Default::default()
        };
        let out = build_instruction(Phase::Identification, &layout(), &ctx).unwrap();
        assert!(out.contains("# Future Feature: <Feature Name>"));
        assert!(out.contains("IDENTIFICATION_COMPLETE"));
    }
}
