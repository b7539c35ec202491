//! `claude-agent`: Rust driver for a conversational Claude CLI subprocess.
//!
//! Speaks the bidirectional `stream-json` protocol: user turns go in on
//! stdin as JSON lines, replies come back as JSONL on stdout, and each turn
//! ends with a `result` record. The process lives for the whole
//! conversation.
//!
//! # Architecture
//!
//! ```text
//! SessionOptions
//!     │
//!     ▼
//! ClaudeProcess   ← spawns `claude --output-format stream-json --input-format stream-json …`
//!     │              reads JSONL from stdout
//!     ▼
//! AgentEvent      ← Text / ToolUse / TurnResult, decoded once
//!     │
//!     ▼
//! ClaudeSession   ← background reader + mpsc channel; `send` writes stdin
//!     │
//!     ▼
//! TurnStream      ← futures::Stream over one turn's events
//! ```

pub mod error;
pub mod event;
pub mod types;

pub(crate) mod process;
pub mod session;
pub mod stream;


pub use error::ClaudeAgentError;
pub use event::AgentEvent;
pub use session::ClaudeSession;
pub use stream::TurnStream;
pub use types::{
    AssistantContent, AssistantMessage, ContentBlock, Message, PermissionMode, ResultMessage,
    SessionOptions, SystemInit, SystemMessage, SystemPayload, UserMessage,
};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, ClaudeAgentError>;
