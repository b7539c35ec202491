use tokio::process::ChildStdin;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::event::AgentEvent;
use crate::process::{self, ClaudeProcess};
use crate::stream::TurnStream;
use crate::types::{Message, SessionOptions, SystemPayload};
use crate::{ClaudeAgentError, Result};

// ─── ClaudeSession ────────────────────────────────────────────────────────

/// One long-lived conversation with a `claude` subprocess.
///
/// A background task owns the process and forwards decoded [`AgentEvent`]s
/// over an mpsc channel; the session keeps stdin so user turns can be
/// written while the reader is blocked. Dropping the session aborts the
/// reader, which kills the child.
///
/// ```rust,ignore
/// use claude_agent::{AgentEvent, ClaudeSession, SessionOptions};
/// use futures::StreamExt;
///
/// let mut session = ClaudeSession::connect(SessionOptions::default())?;
/// session.send("Summarise this repository.").await?;
/// let mut turn = session.turn();
/// while let Some(ev) = turn.next().await {
///     if let AgentEvent::Text(t) = ev? {
///         println!("{t}");
///     }
/// }
/// ```
pub struct ClaudeSession {
    stdin: Option<ChildStdin>,
    events: mpsc::Receiver<Result<AgentEvent>>,
    reader: JoinHandle<()>,
}

impl ClaudeSession {
    /// Spawn `claude` with `opts` and start reading its output.
    pub fn connect(opts: SessionOptions) -> Result<Self> {
        let process = ClaudeProcess::spawn(&opts)?;
        Ok(Self::start(process))
    }

    pub(crate) fn start(mut process: ClaudeProcess) -> Self {
        let stdin = process.take_stdin();
        let (tx, rx) = mpsc::channel(64);
        let reader = tokio::spawn(read_events(process, tx));
        ClaudeSession {
            stdin,
            events: rx,
            reader,
        }
    }

    /// Write one user turn. The reply arrives through [`ClaudeSession::turn`].
    pub async fn send(&mut self, text: &str) -> Result<()> {
        let stdin = self.stdin.as_mut().ok_or(ClaudeAgentError::SessionClosed)?;
        process::write_user_turn(stdin, text).await
    }

    /// Events for the turn in flight, ending after its
    /// [`AgentEvent::TurnResult`].
    pub fn turn(&mut self) -> TurnStream<'_> {
        TurnStream::new(&mut self.events)
    }
}

impl Drop for ClaudeSession {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_events(mut process: ClaudeProcess, tx: mpsc::Sender<Result<AgentEvent>>) {
    loop {
        match process.next_message().await {
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                break;
            }
            Ok(None) => {
                if let Some(exit_err) = process.wait_exit_error().await {
                    let _ = tx.send(Err(exit_err)).await;
                }
                break;
            }
            Ok(Some(msg)) => {
                if msg.is_result() {
                    tracing::trace!(
                        session_id = msg.session_id().unwrap_or_default(),
                        "turn finished"
                    );
                }
                if let Message::System(sys) = &msg {
                    if let SystemPayload::Init(init) = &sys.payload {
                        tracing::debug!(
                            session_id = %sys.session_id,
                            model = %init.model,
                            "claude session initialised"
                        );
                    }
                }
                for ev in AgentEvent::decode(msg) {
                    if tx.send(Ok(ev)).await.is_err() {
                        process.kill().await;
                        return;
                    }
                }
            }
        }
    }
    process.kill().await;
}

// ─── Tests ────────────────────────────────────────────────────────────────
