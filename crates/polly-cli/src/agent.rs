use anyhow::{Context, Result};
use async_trait::async_trait;
use claude_agent::{AgentEvent, ClaudeSession, PermissionMode, SessionOptions};
use futures::stream::BoxStream;
use futures::StreamExt;
use polly_core::config::PollyConfig;
use polly_core::phase::Phase;
use std::path::PathBuf;

/// What a phase asks of the agent runtime when it opens a conversation.
#[derive(Debug, Clone)]
pub struct SessionSpec {
    pub phase: Phase,
    pub instruction: String,
    pub allowed_tools: Vec<String>,
    pub cwd: PathBuf,
}

impl SessionSpec {
    pub fn new(phase: Phase, instruction: String, cwd: PathBuf) -> Self {
        Self {
            phase,
            instruction,
            allowed_tools: phase.allowed_tools().iter().map(|t| t.to_string()).collect(),
            cwd,
        }
    }
}

/// One open conversation.
#[async_trait]
pub trait AgentSession: Send {
    async fn send(&mut self, text: &str) -> Result<()>;

    /// Events for the turn just sent, ending after its `TurnResult`.
    fn events(&mut self) -> BoxStream<'_, Result<AgentEvent>>;
}

#[async_trait]
pub trait AgentConnector: Send + Sync {
    async fn open(&self, spec: SessionSpec) -> Result<Box<dyn AgentSession>>;
}

// ---------------------------------------------------------------------------
// Claude CLI
// ---------------------------------------------------------------------------

/// Opens conversations with the `claude` executable.
#[derive(Debug, Clone)]
pub struct ClaudeConnector {
    executable: String,
    model: Option<String>,
    max_turns: Option<u32>,
}

impl ClaudeConnector {
    pub fn from_config(config: &PollyConfig) -> Self {
        Self {
            executable: config
                .claude_path
                .clone()
                .unwrap_or_else(|| "claude".to_string()),
            model: config.model.clone(),
            max_turns: config.max_turns,
        }
    }

    fn options(&self, exe: PathBuf, spec: SessionSpec) -> SessionOptions {
        SessionOptions {
            model: self.model.clone(),
            max_turns: self.max_turns,
            allowed_tools: spec.allowed_tools,
            permission_mode: PermissionMode::AcceptEdits,
            system_prompt: Some(spec.instruction),
            cwd: Some(spec.cwd),
            path_to_executable: Some(exe.display().to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl AgentConnector for ClaudeConnector {
    async fn open(&self, spec: SessionSpec) -> Result<Box<dyn AgentSession>> {
        let exe = which::which(&self.executable).with_context(|| {
            format!(
                "'{}' not found on PATH; install the Claude CLI or set claude_path in .polly/config.yaml",
                self.executable
            )
        })?;
        tracing::info!(phase = %spec.phase, exe = %exe.display(), "opening agent session");
        let opts = self.options(exe, spec);
        let session = ClaudeSession::connect(opts).context("failed to start claude")?;
        Ok(Box::new(ClaudeAgent(session)))
    }
}

struct ClaudeAgent(ClaudeSession);

#[async_trait]
impl AgentSession for ClaudeAgent {
    async fn send(&mut self, text: &str) -> Result<()> {
        self.0.send(text).await.context("failed to send to claude")
    }

    fn events(&mut self) -> BoxStream<'_, Result<AgentEvent>> {
        self.0.turn().map(|ev| ev.map_err(anyhow::Error::from)).boxed()
    }
}
