use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// One attempt at reading from the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    Line(String),
    /// Ctrl-C while waiting; the caller shows the prompt again.
    Interrupted,
    /// Input is exhausted; treated as `exit`.
    Eof,
}

/// Source of user lines. The prompt label itself is printed by the
/// [`Console`](crate::console::Console) before each read.
#[async_trait]
pub trait Prompter: Send {
    async fn read_line(&mut self) -> Result<UserInput>;

    /// Resolves when the user interrupts while the agent is busy. Never
    /// resolves by default.
    async fn interrupt(&mut self) {
        futures::future::pending::<()>().await
    }
}

pub struct StdinPrompter {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinPrompter {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdinPrompter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Prompter for StdinPrompter {
    async fn read_line(&mut self) -> Result<UserInput> {
        tokio::select! {
            line = self.lines.next_line() => {
                match line.context("failed to read from stdin")? {
                    Some(l) => Ok(UserInput::Line(l)),
                    None => Ok(UserInput::Eof),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("interrupt while waiting for input");
                Ok(UserInput::Interrupted)
            }
        }
    }

    async fn interrupt(&mut self) {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for ctrl-c");
            futures::future::pending::<()>().await
        }
    }
}
