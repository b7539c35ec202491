//! Scripted stand-ins for the terminal and the agent runtime.

use crate::agent::{AgentConnector, AgentSession, SessionSpec};
use crate::console::{Console, Theme};
use crate::input::{Prompter, UserInput};
use anyhow::Result;
use async_trait::async_trait;
use claude_agent::AgentEvent;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// Output capture
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn captured_console() -> (Console, SharedBuffer) {
    let buf = SharedBuffer::default();
    (Console::new(Box::new(buf.clone()), Theme::plain()), buf)
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Replays fixed input, then reports end of input.
pub struct ScriptedPrompter {
    inputs: VecDeque<UserInput>,
    interrupts: usize,
}

impl ScriptedPrompter {
    pub fn lines(lines: &[&str]) -> Self {
        Self::inputs(lines.iter().map(|l| UserInput::Line(l.to_string())).collect())
    }

    pub fn inputs(inputs: Vec<UserInput>) -> Self {
        Self {
            inputs: inputs.into(),
            interrupts: 0,
        }
    }

    /// The next `n` waits on a busy agent are interrupted.
    pub fn interrupting(mut self, n: usize) -> Self {
        self.interrupts = n;
        self
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn read_line(&mut self) -> Result<UserInput> {
        Ok(self.inputs.pop_front().unwrap_or(UserInput::Eof))
    }

    async fn interrupt(&mut self) {
        if self.interrupts == 0 {
            return futures::future::pending().await;
        }
        self.interrupts -= 1;
    }
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

pub fn text(t: &str) -> AgentEvent {
    AgentEvent::Text(t.to_string())
}

pub fn write(path: &str) -> AgentEvent {
    AgentEvent::ToolUse {
        name: "Write".to_string(),
        input: serde_json::json!({ "file_path": path, "content": "# stub" }),
    }
}

pub fn done() -> AgentEvent {
    AgentEvent::TurnResult {
        is_error: false,
        errors: Vec::new(),
    }
}

enum ScriptedTurn {
    Events(Vec<std::result::Result<AgentEvent, String>>),
    Hang,
}

#[derive(Default)]
struct Script {
    turns: VecDeque<ScriptedTurn>,
    opened: Vec<SessionSpec>,
    sent: Vec<String>,
    fail_opens: usize,
}

/// Hands out sessions that replay one scripted turn per message sent.
/// Turns are shared across sessions in the order they were scripted.
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    script: Arc<Mutex<Script>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turn(self, events: Vec<AgentEvent>) -> Self {
        self.push(ScriptedTurn::Events(events.into_iter().map(Ok).collect()));
        self
    }

    /// A turn whose stream fails with `msg` after any `events`.
    pub fn failing_turn(self, events: Vec<AgentEvent>, msg: &str) -> Self {
        let mut items: Vec<_> = events.into_iter().map(Ok).collect();
        items.push(Err(msg.to_string()));
        self.push(ScriptedTurn::Events(items));
        self
    }

    /// A turn that never produces an event.
    pub fn hanging_turn(self) -> Self {
        self.push(ScriptedTurn::Hang);
        self
    }

    /// The next `n` calls to `open` fail.
    pub fn failing_opens(self, n: usize) -> Self {
        self.script.lock().unwrap().fail_opens = n;
        self
    }

    fn push(&self, turn: ScriptedTurn) {
        self.script.lock().unwrap().turns.push_back(turn);
    }

    pub fn opened(&self) -> Vec<SessionSpec> {
        self.script.lock().unwrap().opened.clone()
    }

    pub fn sent(&self) -> Vec<String> {
        self.script.lock().unwrap().sent.clone()
    }
}

#[async_trait]
impl AgentConnector for ScriptedConnector {
    async fn open(&self, spec: SessionSpec) -> Result<Box<dyn AgentSession>> {
        let mut script = self.script.lock().unwrap();
        if script.fail_opens > 0 {
            script.fail_opens -= 1;
            anyhow::bail!("agent runtime unavailable");
        }
        script.opened.push(spec);
        Ok(Box::new(ScriptedSession {
            script: Arc::clone(&self.script),
            current: None,
        }))
    }
}

struct ScriptedSession {
    script: Arc<Mutex<Script>>,
    current: Option<ScriptedTurn>,
}

#[async_trait]
impl AgentSession for ScriptedSession {
    async fn send(&mut self, text: &str) -> Result<()> {
        let mut script = self.script.lock().unwrap();
        script.sent.push(text.to_string());
        self.current = Some(
            script
                .turns
                .pop_front()
                .unwrap_or_else(|| ScriptedTurn::Events(vec![Err("no scripted turn".into())])),
        );
        Ok(())
    }

    fn events(&mut self) -> BoxStream<'_, Result<AgentEvent>> {
        match self.current.take() {
            Some(ScriptedTurn::Events(items)) => {
                futures::stream::iter(items.into_iter().map(|r| r.map_err(anyhow::Error::msg)))
                    .boxed()
            }
            Some(ScriptedTurn::Hang) => futures::stream::pending().boxed(),
            None => futures::stream::empty().boxed(),
        }
    }
}
