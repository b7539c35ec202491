use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// One stage of the workflow.
///
/// The four numbered phases run in order for a single feature.
/// `Identification` and `Coordinator` sit outside that sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    ContextGathering,
    Discovery,
    Grouping,
    Generation,
    Identification,
    Coordinator,
}

pub const READ_TOOLS: &[&str] = &["Read", "Glob", "Grep"];
pub const WRITE_TOOLS: &[&str] = &["Read", "Glob", "Grep", "Write"];
pub const COORDINATOR_TOOLS: &[&str] = &["Read", "Write", "Glob", "Grep"];

impl Phase {
    /// The numbered feature pipeline, in execution order.
    pub fn pipeline() -> &'static [Phase] {
        &[Phase::Discovery, Phase::Grouping, Phase::Generation]
    }

    /// Phase number as shown to users; `0` for the unnumbered variants.
    pub fn number(self) -> u8 {
        match self {
            Phase::ContextGathering => 0,
            Phase::Discovery => 1,
            Phase::Grouping => 2,
            Phase::Generation => 3,
            Phase::Identification | Phase::Coordinator => 0,
        }
    }

    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::ContextGathering => Some(Phase::Discovery),
            Phase::Discovery => Some(Phase::Grouping),
            Phase::Grouping => Some(Phase::Generation),
            Phase::Generation | Phase::Identification | Phase::Coordinator => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::ContextGathering => "context_gathering",
            Phase::Discovery => "discovery",
            Phase::Grouping => "grouping",
            Phase::Generation => "generation",
            Phase::Identification => "identification",
            Phase::Coordinator => "coordinator",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Phase::ContextGathering => "Context Gathering",
            Phase::Discovery => "Feature Discovery",
            Phase::Grouping => "Incremental Grouping",
            Phase::Generation => "Prompt Generation",
            Phase::Identification => "Feature Identification",
            Phase::Coordinator => "Polly",
        }
    }

    /// Title with its phase number, for headers.
    pub fn heading(self) -> String {
        match self {
            Phase::Identification | Phase::Coordinator => self.title().to_string(),
            _ => format!("Phase {}: {}", self.number(), self.title()),
        }
    }

    /// Completion token the agent emits when this phase is done.
    pub fn sentinel_token(self) -> Option<&'static str> {
        match self {
            Phase::ContextGathering => Some("PHASE_0_COMPLETE"),
            Phase::Discovery => Some("PHASE_1_COMPLETE"),
            Phase::Grouping => Some("PHASE_2_COMPLETE"),
            Phase::Generation => Some("PHASE_3_COMPLETE"),
            Phase::Identification => Some("IDENTIFICATION_COMPLETE"),
            Phase::Coordinator => None,
        }
    }

    pub fn allowed_tools(self) -> &'static [&'static str] {
        match self {
            Phase::ContextGathering => READ_TOOLS,
            Phase::Coordinator => COORDINATOR_TOOLS,
            _ => WRITE_TOOLS,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Sentinel
// ---------------------------------------------------------------------------

/// How a sentinel token is recognised in a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentinelMatch {
    /// Token anywhere in the text. Incidental mentions also end the phase.
    #[default]
    Substring,
    /// Token must be alone on a line (surrounding whitespace allowed).
    OwnLine,
}

/// Result of classifying one finished agent turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Phase continues; carries the displayable text.
    Continue(String),
    /// Phase finished; carries the displayable text with the token removed.
    PhaseComplete(String),
}

impl TurnOutcome {
    pub fn text(&self) -> &str {
        match self {
            TurnOutcome::Continue(t) | TurnOutcome::PhaseComplete(t) => t,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, TurnOutcome::PhaseComplete(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sentinel {
    token: Option<&'static str>,
    mode: SentinelMatch,
}

impl Sentinel {
    pub fn new(token: &'static str, mode: SentinelMatch) -> Self {
        Self {
            token: Some(token),
            mode,
        }
    }

    /// A sentinel that never fires; the phase only ends on exit.
    pub fn none() -> Self {
        Self {
            token: None,
            mode: SentinelMatch::Substring,
        }
    }

    pub fn for_phase(phase: Phase, mode: SentinelMatch) -> Self {
        match phase.sentinel_token() {
            Some(token) => Self::new(token, mode),
            None => Self::none(),
        }
    }

    pub fn token(&self) -> Option<&'static str> {
        self.token
    }

    pub fn contains(&self, text: &str) -> bool {
        let Some(token) = self.token else {
            return false;
        };
        match self.mode {
            SentinelMatch::Substring => text.contains(token),
            SentinelMatch::OwnLine => text.lines().any(|l| l.trim() == token),
        }
    }

    /// Remove the token where it counts as a match: every occurrence in
    /// substring mode, only the lines holding it alone in own-line mode.
    /// Text is otherwise untouched.
    pub fn strip(&self, text: &str) -> String {
        let Some(token) = self.token else {
            return text.to_string();
        };
        match self.mode {
            SentinelMatch::Substring => text.replace(token, ""),
            SentinelMatch::OwnLine => text
                .split_inclusive('\n')
                .filter(|l| l.trim() != token)
                .collect(),
        }
    }

    pub fn classify(&self, text: &str) -> TurnOutcome {
        let shown = self.strip(text);
        if self.contains(text) {
            TurnOutcome::PhaseComplete(shown)
        } else {
            TurnOutcome::Continue(shown)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
