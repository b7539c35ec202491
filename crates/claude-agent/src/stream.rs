use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::event::AgentEvent;
use crate::{ClaudeAgentError, Result};

// ─── TurnStream ───────────────────────────────────────────────────────────

/// The events of a single user turn.
///
/// Borrows the session's event channel and yields until the turn's
/// [`AgentEvent::TurnResult`], then ends; the next turn starts a fresh
/// stream over the same channel. An error ends the turn. If the reader
/// goes away mid-turn the stream yields [`ClaudeAgentError::SessionClosed`]
/// once before ending.
pub struct TurnStream<'a> {
    rx: &'a mut mpsc::Receiver<Result<AgentEvent>>,
    done: bool,
}

impl<'a> TurnStream<'a> {
    pub(crate) fn new(rx: &'a mut mpsc::Receiver<Result<AgentEvent>>) -> Self {
        Self { rx, done: false }
    }
}

impl Stream for TurnStream<'_> {
    type Item = Result<AgentEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        match self.rx.poll_recv(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(None) => {
                self.done = true;
                Poll::Ready(Some(Err(ClaudeAgentError::SessionClosed)))
            }
            Poll::Ready(Some(item)) => {
                if matches!(&item, Err(_) | Ok(AgentEvent::TurnResult { .. })) {
                    self.done = true;
                }
                Poll::Ready(Some(item))
            }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn result() -> AgentEvent {
        AgentEvent::TurnResult {
            is_error: false,
            errors: Vec::new(),
        }
    }

    #[tokio::test]
    async fn stops_after_turn_result() {
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(Ok(AgentEvent::Text("one".into()))).await.unwrap();
        tx.send(Ok(result())).await.unwrap();
        tx.send(Ok(AgentEvent::Text("next turn".into()))).await.unwrap();

        let first: Vec<_> = TurnStream::new(&mut rx).collect().await;
        assert_eq!(first.len(), 2);

        // The next turn picks up where the last one stopped.
        let mut second = TurnStream::new(&mut rx);
        let ev = second.next().await.unwrap().unwrap();
        assert_eq!(ev, AgentEvent::Text("next turn".into()));
    }

    #[tokio::test]
    async fn closed_channel_yields_session_closed_once() {
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(Ok(AgentEvent::Text("partial".into()))).await.unwrap();
        drop(tx);

        let events: Vec<_> = TurnStream::new(&mut rx).collect().await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], Err(ClaudeAgentError::SessionClosed)));
    }

    #[tokio::test]
    async fn error_ends_the_turn() {
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(Err(ClaudeAgentError::Process("exit 1".into())))
            .await
            .unwrap();
        tx.send(Ok(result())).await.unwrap();

        let events: Vec<_> = TurnStream::new(&mut rx).collect().await;
        assert_eq!(events.len(), 1);
        assert!(events[0].is_err());
    }
}
