use crate::agent::{AgentConnector, AgentSession, SessionSpec};
use crate::console::Console;
use crate::input::{Prompter, UserInput};
use anyhow::{anyhow, bail, Context, Result};
use claude_agent::AgentEvent;
use futures::StreamExt;
use polly_core::config::PollyConfig;
use polly_core::machine::{InputDecision, PhaseMachine};
use polly_core::paths::ProjectLayout;
use polly_core::phase::{Phase, Sentinel, SentinelMatch};
use polly_core::session::PhaseSession;
use std::path::PathBuf;
use std::time::Duration;

pub const USER_PROMPT: &str = "You: ";

#[derive(Debug, Clone, Default)]
pub struct DriverSettings {
    pub sentinel_match: SentinelMatch,
    /// Bound on each wait for the next agent event.
    pub turn_timeout: Option<Duration>,
}

impl DriverSettings {
    pub fn from_config(config: &PollyConfig) -> Self {
        Self {
            sentinel_match: config.sentinel_match,
            turn_timeout: config.turn_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// One phase to run: the instruction the agent starts from and the question
/// the user sees first.
#[derive(Debug, Clone)]
pub struct PhaseRequest {
    pub phase: Phase,
    pub instruction: String,
    pub question: String,
    /// Sent in place of an empty answer.
    pub default_input: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseOutcome {
    Completed,
    Aborted,
}

#[derive(Debug, Clone)]
pub struct PhaseReport {
    pub outcome: PhaseOutcome,
    /// Agent text for the whole phase, sentinel removed.
    pub transcript: String,
    pub written: Vec<PathBuf>,
    pub future_features: Vec<PathBuf>,
    /// Feature summary written during the phase, if any.
    pub summary_slug: Option<String>,
}

impl PhaseReport {
    pub fn is_complete(&self) -> bool {
        self.outcome == PhaseOutcome::Completed
    }
}

/// Runs a single phase conversation to completion or abort.
///
/// The agent session opens on the first real input, so leaving a phase
/// before saying anything never starts the runtime. Failures talking to the
/// agent are shown and the user is asked again; the session is reopened on
/// the next input if it was lost.
pub struct PhaseDriver<'a> {
    pub console: &'a mut Console,
    pub prompter: &'a mut dyn Prompter,
    pub connector: &'a dyn AgentConnector,
    pub settings: &'a DriverSettings,
}

impl PhaseDriver<'_> {
    pub async fn run(&mut self, layout: &ProjectLayout, req: PhaseRequest) -> Result<PhaseReport> {
        let phase = req.phase;
        let title = phase.heading();
        tracing::info!(phase = %phase, "phase started");
        self.console.phase_header(&title);

        let mut machine = PhaseMachine::new(Sentinel::for_phase(phase, self.settings.sentinel_match));
        if let Some(d) = &req.default_input {
            machine = machine.with_default(d.clone());
        }
        let mut session = PhaseSession::new(layout.clone());
        let mut agent: Option<Box<dyn AgentSession>> = None;

        self.console.agent_text(&req.question);
        machine.open()?;

        let outcome = loop {
            self.console.prompt(USER_PROMPT);
            let raw = match self.prompter.read_line().await? {
                UserInput::Line(l) => l,
                UserInput::Interrupted => {
                    self.console.blank();
                    continue;
                }
                UserInput::Eof => {
                    self.console.blank();
                    "exit".to_string()
                }
            };
            let text = match machine.submit(&raw)? {
                InputDecision::Send(t) => t,
                InputDecision::Reprompt => continue,
                InputDecision::Abort => break PhaseOutcome::Aborted,
            };

            match self
                .exchange(&mut agent, &req, &text, &mut session, machine.sentinel())
                .await
            {
                Ok(turn_text) => {
                    if machine.finish_turn(&turn_text)?.is_complete() {
                        break PhaseOutcome::Completed;
                    }
                }
                Err(e) => {
                    tracing::warn!(phase = %phase, error = %e, "agent turn failed");
                    self.console.error(&format!("{e:#}"));
                    agent = None;
                    machine.fail_turn()?;
                }
            }
        };

        match outcome {
            PhaseOutcome::Completed => {
                tracing::info!(phase = %phase, "phase complete");
                self.console.phase_complete(&title, None);
            }
            PhaseOutcome::Aborted => {
                tracing::info!(phase = %phase, "phase aborted");
                self.console.info(&format!("Leaving {title}."));
            }
        }

        let summary_slug = session.written_summary_slug();
        let (transcript, written, future_features) = session.into_parts();
        Ok(PhaseReport {
            outcome,
            transcript,
            written,
            future_features,
            summary_slug,
        })
    }

    /// Send one user turn and stream the reply. Returns the raw turn text
    /// with any sentinel still in it.
    async fn exchange(
        &mut self,
        agent: &mut Option<Box<dyn AgentSession>>,
        req: &PhaseRequest,
        text: &str,
        session: &mut PhaseSession,
        sentinel: &Sentinel,
    ) -> Result<String> {
        if agent.is_none() {
            let spec = SessionSpec::new(
                req.phase,
                req.instruction.clone(),
                session.layout().root.clone(),
            );
            *agent = Some(
                self.connector
                    .open(spec)
                    .await
                    .context("could not start the agent")?,
            );
        }
        let Some(agent) = agent.as_mut() else {
            bail!("agent session unavailable");
        };

        tracing::debug!(phase = %req.phase, chars = text.len(), "sending turn");
        agent.send(text).await?;

        let mut turn_text = String::new();
        let limit = self.settings.turn_timeout;
        let mut events = agent.events();
        loop {
            let wait = async {
                match limit {
                    Some(limit) => tokio::time::timeout(limit, events.next())
                        .await
                        .map_err(|_| {
                            anyhow!("agent did not respond within {}s", limit.as_secs_f32())
                        }),
                    None => Ok(events.next().await),
                }
            };
            // Ctrl-C while the agent is busy cancels the turn, not the program.
            let next = tokio::select! {
                biased;
                next = wait => next?,
                _ = self.prompter.interrupt() => {
                    tracing::info!(phase = %req.phase, "turn interrupted");
                    bail!("interrupted; the agent turn was cancelled");
                }
            };
            let Some(event) = next else {
                bail!("agent stream ended before the turn finished");
            };
            match event? {
                AgentEvent::Text(t) => {
                    tracing::debug!(chars = t.len(), "agent text");
                    let shown = sentinel.strip(&t);
                    self.console.agent_text(&shown);
                    session.push_text(&shown);
                    if !turn_text.is_empty() {
                        turn_text.push('\n');
                    }
                    turn_text.push_str(&t);
                }
                AgentEvent::ToolUse { name, input } => {
                    tracing::debug!(tool = %name, "agent tool use");
                    self.console.tool_usage(&name);
                    if let Some(path) = session.record_tool_use(&name, &input) {
                        self.console
                            .info(&format!("Captured future feature: {}", path.display()));
                    }
                }
                AgentEvent::TurnResult { is_error, errors } => {
                    if is_error {
                        let detail = if errors.is_empty() {
                            "no details".to_string()
                        } else {
                            errors.join("; ")
                        };
                        self.console
                            .warning(&format!("The agent reported a problem: {detail}"));
                    }
                    break;
                }
            }
        }
        Ok(turn_text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        captured_console, done, text, write, ScriptedConnector, ScriptedPrompter,
    };

    fn request(phase: Phase) -> PhaseRequest {
        PhaseRequest {
            phase,
            instruction: "instruction".into(),
            question: "What feature would you like to define?".into(),
            default_input: None,
        }
    }

    async fn run(
        connector: &ScriptedConnector,
        mut prompter: ScriptedPrompter,
        settings: DriverSettings,
        req: PhaseRequest,
    ) -> (PhaseReport, String) {
        let (mut console, buf) = captured_console();
        let layout = ProjectLayout::new("/proj");
        let report = PhaseDriver {
            console: &mut console,
            prompter: &mut prompter,
            connector,
            settings: &settings,
        }
        .run(&layout, req)
        .await
        .unwrap();
        (report, buf.contents())
    }

    #[tokio::test]
    async fn completes_on_sentinel_and_hides_it() {
        let connector = ScriptedConnector::new()
            .turn(vec![text("Tell me more about the users."), done()])
            .turn(vec![
                write("/proj/features/cart.md"),
                text("Saved the summary.\nPHASE_1_COMPLETE"),
                done(),
            ]);
        let prompter = ScriptedPrompter::lines(&["a shopping cart", "shoppers"]);

        let (report, out) = run(
            &connector,
            prompter,
            DriverSettings::default(),
            request(Phase::Discovery),
        )
        .await;

        assert!(report.is_complete());
        assert_eq!(report.summary_slug.as_deref(), Some("cart"));
        assert!(!out.contains("PHASE_1_COMPLETE"));
        assert!(!report.transcript.contains("PHASE_1_COMPLETE"));
        assert!(out.contains("[Using Write...]"));
        assert!(out.contains("✓ Phase 1: Feature Discovery Complete"));
        assert_eq!(connector.sent(), ["a shopping cart", "shoppers"]);
        assert_eq!(connector.opened().len(), 1);
    }

    #[tokio::test]
    async fn exit_aborts_without_opening_agent() {
        let connector = ScriptedConnector::new();
        let (report, _) = run(
            &connector,
            ScriptedPrompter::lines(&["  QUIT "]),
            DriverSettings::default(),
            request(Phase::Discovery),
        )
        .await;
        assert_eq!(report.outcome, PhaseOutcome::Aborted);
        assert!(connector.opened().is_empty());
    }

    #[tokio::test]
    async fn end_of_input_aborts() {
        let connector = ScriptedConnector::new();
        let (report, _) = run(
            &connector,
            ScriptedPrompter::lines(&[]),
            DriverSettings::default(),
            request(Phase::Grouping),
        )
        .await;
        assert_eq!(report.outcome, PhaseOutcome::Aborted);
    }

    #[tokio::test]
    async fn empty_and_interrupted_input_reprompt() {
        let connector = ScriptedConnector::new().turn(vec![text("PHASE_2_COMPLETE"), done()]);
        let prompter = ScriptedPrompter::inputs(vec![
            UserInput::Line("   ".into()),
            UserInput::Interrupted,
            UserInput::Line("go".into()),
        ]);
        let (report, out) = run(
            &connector,
            prompter,
            DriverSettings::default(),
            request(Phase::Grouping),
        )
        .await;
        assert!(report.is_complete());
        assert_eq!(connector.sent(), ["go"]);
        assert_eq!(out.matches(USER_PROMPT).count(), 3);
    }

    #[tokio::test]
    async fn default_input_substitutes_for_empty_line() {
        let connector = ScriptedConnector::new().turn(vec![text("PHASE_0_COMPLETE"), done()]);
        let mut req = request(Phase::ContextGathering);
        req.default_input = Some("Review the existing features.".into());
        let (report, _) = run(
            &connector,
            ScriptedPrompter::lines(&[""]),
            DriverSettings::default(),
            req,
        )
        .await;
        assert!(report.is_complete());
        assert_eq!(connector.sent(), ["Review the existing features."]);
    }

    #[tokio::test]
    async fn other_phase_sentinel_does_not_complete() {
        let connector = ScriptedConnector::new().turn(vec![text("PHASE_3_COMPLETE"), done()]);
        let (report, _) = run(
            &connector,
            ScriptedPrompter::lines(&["hi"]),
            DriverSettings::default(),
            request(Phase::Grouping),
        )
        .await;
        assert_eq!(report.outcome, PhaseOutcome::Aborted);
    }

    #[tokio::test]
    async fn own_line_mode_ignores_inline_mention() {
        let connector = ScriptedConnector::new()
            .turn(vec![text("I'll print PHASE_2_COMPLETE when done."), done()])
            .turn(vec![text("Done.\nPHASE_2_COMPLETE\n"), done()]);
        let settings = DriverSettings {
            sentinel_match: SentinelMatch::OwnLine,
            turn_timeout: None,
        };
        let (report, _) = run(
            &connector,
            ScriptedPrompter::lines(&["go", "ok"]),
            settings,
            request(Phase::Grouping),
        )
        .await;
        assert!(report.is_complete());
        assert_eq!(connector.sent().len(), 2);
    }

    #[tokio::test]
    async fn captures_future_features_by_path_only() {
        let connector = ScriptedConnector::new().turn(vec![
            write("/proj/future-features/search.md"),
            write("future-features/export.md"),
            write("/proj/notes/future-features.md"),
            AgentEvent::ToolUse {
                name: "Read".into(),
                input: serde_json::json!({ "file_path": "/proj/future-features/old.md" }),
            },
            text("PHASE_1_COMPLETE"),
            done(),
        ]);
        let (report, out) = run(
            &connector,
            ScriptedPrompter::lines(&["go"]),
            DriverSettings::default(),
            request(Phase::Discovery),
        )
        .await;
        assert_eq!(
            report.future_features,
            [
                PathBuf::from("/proj/future-features/search.md"),
                PathBuf::from("/proj/future-features/export.md"),
            ]
        );
        assert_eq!(report.written.len(), 3);
        assert!(out.contains("[Using Read...]"));
    }

    #[tokio::test]
    async fn agent_failure_recovers_and_reopens() {
        let connector = ScriptedConnector::new()
            .failing_turn(vec![text("partial")], "claude exited with code 1")
            .turn(vec![text("PHASE_1_COMPLETE"), done()]);
        let (report, out) = run(
            &connector,
            ScriptedPrompter::lines(&["first", "again"]),
            DriverSettings::default(),
            request(Phase::Discovery),
        )
        .await;
        assert!(report.is_complete());
        assert!(out.contains("Error: claude exited with code 1"));
        assert_eq!(connector.sent(), ["first", "again"]);
        assert_eq!(connector.opened().len(), 2);
    }

    #[tokio::test]
    async fn failure_to_open_is_recoverable() {
        let connector = ScriptedConnector::new()
            .failing_opens(1)
            .turn(vec![text("PHASE_1_COMPLETE"), done()]);
        let (report, out) = run(
            &connector,
            ScriptedPrompter::lines(&["first", "second"]),
            DriverSettings::default(),
            request(Phase::Discovery),
        )
        .await;
        assert!(report.is_complete());
        assert!(out.contains("could not start the agent"));
        assert_eq!(connector.sent(), ["second"]);
    }

    #[tokio::test]
    async fn watchdog_expiry_is_retryable() {
        let connector = ScriptedConnector::new()
            .hanging_turn()
            .turn(vec![text("PHASE_1_COMPLETE"), done()]);
        let settings = DriverSettings {
            sentinel_match: SentinelMatch::Substring,
            turn_timeout: Some(Duration::from_millis(20)),
        };
        let (report, out) = run(
            &connector,
            ScriptedPrompter::lines(&["hello", "hello again"]),
            settings,
            request(Phase::Discovery),
        )
        .await;
        assert!(report.is_complete());
        assert!(out.contains("did not respond"));
    }

    #[tokio::test]
    async fn interrupt_cancels_a_stalled_turn() {
        let connector = ScriptedConnector::new()
            .hanging_turn()
            .turn(vec![text("Back again.\nPHASE_1_COMPLETE"), done()]);
        let prompter = ScriptedPrompter::lines(&["hello", "hello again"]).interrupting(1);
        let (report, out) = run(
            &connector,
            prompter,
            DriverSettings::default(),
            request(Phase::Discovery),
        )
        .await;

        assert!(report.is_complete());
        assert!(out.contains("Error: interrupted; the agent turn was cancelled"));
        assert!(out.contains("Back again."));
        // The cancelled session is dropped and a fresh one opened.
        assert_eq!(connector.opened().len(), 2);
        assert_eq!(connector.sent(), ["hello", "hello again"]);
    }

    #[tokio::test]
    async fn interrupt_is_ignored_while_events_flow() {
        let connector =
            ScriptedConnector::new().turn(vec![text("All done.\nPHASE_1_COMPLETE"), done()]);
        let prompter = ScriptedPrompter::lines(&["hello"]).interrupting(1);
        let (report, out) = run(
            &connector,
            prompter,
            DriverSettings::default(),
            request(Phase::Discovery),
        )
        .await;
        assert!(report.is_complete());
        assert!(!out.contains("interrupted"));
    }

    #[tokio::test]
    async fn error_result_is_shown_but_turn_finishes() {
        let connector = ScriptedConnector::new().turn(vec![
            text("Ran out of turns."),
            AgentEvent::TurnResult {
                is_error: true,
                errors: vec!["Reached maximum turn limit".into()],
            },
        ]);
        let (report, out) = run(
            &connector,
            ScriptedPrompter::lines(&["go", "exit"]),
            DriverSettings::default(),
            request(Phase::Discovery),
        )
        .await;
        assert_eq!(report.outcome, PhaseOutcome::Aborted);
        assert!(out.contains("The agent reported a problem: Reached maximum turn limit"));
        assert_eq!(report.transcript, "Ran out of turns.");
    }
}
