use crate::error::{PollyError, Result};
use crate::phase::{Sentinel, TurnOutcome};
use serde::Serialize;
use std::fmt;

// ---------------------------------------------------------------------------
// PhaseState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseState {
    NotStarted,
    AwaitingUserInput,
    ProcessingTurn,
    Complete,
    Aborted,
}

impl PhaseState {
    pub fn as_str(self) -> &'static str {
        match self {
            PhaseState::NotStarted => "not_started",
            PhaseState::AwaitingUserInput => "awaiting_user_input",
            PhaseState::ProcessingTurn => "processing_turn",
            PhaseState::Complete => "complete",
            PhaseState::Aborted => "aborted",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PhaseState::Complete | PhaseState::Aborted)
    }
}

impl fmt::Display for PhaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the driver should do with one line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputDecision {
    Send(String),
    Reprompt,
    Abort,
}

pub fn is_exit_keyword(input: &str) -> bool {
    let t = input.trim();
    t.eq_ignore_ascii_case("exit") || t.eq_ignore_ascii_case("quit")
}

// ---------------------------------------------------------------------------
// PhaseMachine
// ---------------------------------------------------------------------------

/// Transition logic for one phase run. Holds no I/O; the driver feeds it
/// user input and finished agent turns.
#[derive(Debug, Clone)]
pub struct PhaseMachine {
    state: PhaseState,
    sentinel: Sentinel,
    default_input: Option<String>,
}

impl PhaseMachine {
    pub fn new(sentinel: Sentinel) -> Self {
        Self {
            state: PhaseState::NotStarted,
            sentinel,
            default_input: None,
        }
    }

    /// Value substituted when the user submits an empty line.
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default_input = Some(default.into());
        self
    }

    pub fn state(&self) -> PhaseState {
        self.state
    }

    pub fn sentinel(&self) -> &Sentinel {
        &self.sentinel
    }

    fn transition(&mut self, expected: PhaseState, to: PhaseState) -> Result<()> {
        if self.state != expected {
            return Err(PollyError::InvalidTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        tracing::debug!(from = %self.state, to = %to, "phase state");
        self.state = to;
        Ok(())
    }

    /// The opening question has been shown.
    pub fn open(&mut self) -> Result<()> {
        self.transition(PhaseState::NotStarted, PhaseState::AwaitingUserInput)
    }

    pub fn submit(&mut self, raw: &str) -> Result<InputDecision> {
        if self.state != PhaseState::AwaitingUserInput {
            return Err(PollyError::InvalidTransition {
                from: self.state.to_string(),
                to: PhaseState::ProcessingTurn.to_string(),
            });
        }
        if is_exit_keyword(raw) {
            self.transition(PhaseState::AwaitingUserInput, PhaseState::Aborted)?;
            return Ok(InputDecision::Abort);
        }
        let text = raw.trim();
        let text = if text.is_empty() {
            match &self.default_input {
                Some(d) => d.clone(),
                None => return Ok(InputDecision::Reprompt),
            }
        } else {
            text.to_string()
        };
        self.transition(PhaseState::AwaitingUserInput, PhaseState::ProcessingTurn)?;
        Ok(InputDecision::Send(text))
    }

    /// The agent's result marker arrived; `text` is everything it said this turn.
    pub fn finish_turn(&mut self, text: &str) -> Result<TurnOutcome> {
        let outcome = self.sentinel.classify(text);
        let to = if outcome.is_complete() {
            PhaseState::Complete
        } else {
            PhaseState::AwaitingUserInput
        };
        self.transition(PhaseState::ProcessingTurn, to)?;
        Ok(outcome)
    }

    /// Talking to the agent failed; wait for the user again.
    pub fn fail_turn(&mut self) -> Result<()> {
        self.transition(PhaseState::ProcessingTurn, PhaseState::AwaitingUserInput)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
