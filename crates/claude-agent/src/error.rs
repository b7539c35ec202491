use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClaudeAgentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse stream-json line: {source}\n  line: {line}")]
    Parse {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Process error: {0}")]
    Process(String),

    #[error("Claude session closed before the turn finished")]
    SessionClosed,
}
