use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

// ─── Wire messages ────────────────────────────────────────────────────────

/// One JSONL record from `claude --output-format stream-json`.
/// Discriminated by the JSON `"type"` field.
///
/// Only the records a conversational session acts on are modelled in full.
/// Everything else (`stream_event`, `tool_progress`, `rate_limit_event`, …)
/// lands in [`Message::Other`] and is dropped at the event boundary.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    System(SystemMessage),
    Assistant(AssistantMessage),
    User(UserMessage),
    Result(ResultMessage),
    #[serde(other)]
    Other,
}

impl Message {
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Message::System(m) => Some(&m.session_id),
            Message::Assistant(m) => Some(&m.session_id),
            Message::User(m) => Some(&m.session_id),
            Message::Result(m) => Some(&m.session_id),
            Message::Other => None,
        }
    }

    pub fn is_result(&self) -> bool {
        matches!(self, Message::Result(_))
    }
}

// ─── System ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SystemMessage {
    pub session_id: String,
    #[serde(flatten)]
    pub payload: SystemPayload,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "subtype", rename_all = "snake_case")]
pub enum SystemPayload {
    Init(SystemInit),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SystemInit {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default, alias = "permissionMode")]
    pub permission_mode: String,
    #[serde(default)]
    pub cwd: String,
}

// ─── Assistant ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssistantMessage {
    pub message: AssistantContent,
    #[serde(default)]
    pub parent_tool_use_id: Option<String>,
    pub session_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssistantContent {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        /// Tool inputs differ per tool, so this stays a `Value`.
        input: serde_json::Value,
    },
    Thinking {
        thinking: String,
    },
    #[serde(other)]
    Unknown,
}

// ─── User ─────────────────────────────────────────────────────────────────

/// Echoed tool results. Carried so the stream parses; never acted on.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserMessage {
    pub session_id: String,
    #[serde(default)]
    pub parent_tool_use_id: Option<String>,
}

// ─── Result ───────────────────────────────────────────────────────────────

/// `type = "result"`: closes one user turn.
///
/// `subtype` is `success` or one of the `error_*` variants; the session
/// treats them uniformly as end-of-turn and exposes `is_error`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResultMessage {
    pub subtype: String,
    pub session_id: String,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub num_turns: u32,
    #[serde(default)]
    pub total_cost_usd: f64,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ResultMessage {
    pub fn is_error(&self) -> bool {
        self.is_error || self.subtype != "success"
    }
}

// ─── SessionOptions ───────────────────────────────────────────────────────

/// How to start a conversational `claude` session.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Claude model name; the CLI default when unset.
    pub model: Option<String>,
    /// Agentic turn limit applied to every user turn.
    pub max_turns: Option<u32>,
    /// Tools auto-approved without prompting.
    pub allowed_tools: Vec<String>,
    pub permission_mode: PermissionMode,
    /// Replaces the default system prompt.
    pub system_prompt: Option<String>,
    /// Working directory for the subprocess.
    pub cwd: Option<PathBuf>,
    /// Extra environment for the subprocess.
    pub env: HashMap<String, String>,
    /// Custom path to the `claude` binary (default: `"claude"`).
    pub path_to_executable: Option<String>,
}

/// Permission mode; controls how tool executions are authorized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PermissionMode {
    #[default]
    Default,
    /// Auto-accept file edit operations
    AcceptEdits,
    BypassPermissions,
    Plan,
}

impl PermissionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionMode::Default => "default",
            PermissionMode::AcceptEdits => "acceptEdits",
            PermissionMode::BypassPermissions => "bypassPermissions",
            PermissionMode::Plan => "plan",
        }
    }
}
