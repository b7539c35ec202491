use std::process::Stdio;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::types::{Message, PermissionMode, SessionOptions};
use crate::{ClaudeAgentError, Result};

// ─── ClaudeProcess ────────────────────────────────────────────────────────

/// A running `claude --output-format stream-json --input-format stream-json`
/// subprocess.
///
/// Stdin stays open for the life of the process: every user turn is one JSON
/// line written to it, and each turn's output is read as JSONL from stdout
/// up to its `result` record. Stderr is captured in a background task and
/// surfaced on process exit errors.
pub(crate) struct ClaudeProcess {
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
    stdin: Option<ChildStdin>,
    stderr_buf: Arc<Mutex<String>>,
}

impl ClaudeProcess {
    /// Spawn the `claude` binary for a multi-turn conversation.
    ///
    /// Nothing is written to stdin yet; the first user turn starts the
    /// conversation. `CLAUDECODE` is removed from the environment so this
    /// works from inside a running Claude session too.
    pub(crate) fn spawn(opts: &SessionOptions) -> Result<Self> {
        let mut cmd = build_command(opts);
        cmd.env_remove("CLAUDECODE");
        for (k, v) in &opts.env {
            cmd.env(k, v);
        }
        Self::from_command(cmd)
    }

    /// Spawn an arbitrary command as a mock Claude process.
    #[cfg(test)]
    pub(crate) fn spawn_command(cmd: Command) -> Result<Self> {
        Self::from_command(cmd)
    }

    fn from_command(mut cmd: Command) -> Result<Self> {
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(ClaudeAgentError::Io)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClaudeAgentError::Process("stdout not captured".into()))?;

        let stdin = child.stdin.take();

        let stderr_buf = Arc::new(Mutex::new(String::new()));
        if let Some(stderr) = child.stderr.take() {
            let buf = Arc::clone(&stderr_buf);
            tokio::spawn(async move {
                let mut reader = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    if let Ok(mut b) = buf.lock() {
                        if !b.is_empty() {
                            b.push('\n');
                        }
                        b.push_str(&line);
                    }
                }
            });
        }

        let lines = BufReader::new(stdout).lines();
        Ok(Self {
            child,
            lines,
            stdin,
            stderr_buf,
        })
    }

    /// Hand the stdin pipe to the caller so writes can happen while another
    /// task is blocked reading stdout.
    pub(crate) fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.stdin.take()
    }

    /// Read the next non-empty JSONL line from stdout and deserialize it.
    ///
    /// Records of an unmodelled `type` decode as [`Message::Other`]; a line
    /// that fails to decode is a [`ClaudeAgentError::Parse`]. Returns
    /// `Ok(None)` on EOF.
    pub(crate) async fn next_message(&mut self) -> Result<Option<Message>> {
        loop {
            match self.lines.next_line().await {
                Err(e) => return Err(ClaudeAgentError::Io(e)),
                Ok(None) => return Ok(None),
                Ok(Some(line)) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    return match serde_json::from_str::<Message>(trimmed) {
                        Ok(msg) => Ok(Some(msg)),
                        Err(e) => Err(ClaudeAgentError::Parse {
                            line: trimmed.to_owned(),
                            source: e,
                        }),
                    };
                }
            }
        }
    }

    /// Wait for the child to exit and return an error if the exit code is
    /// non-zero or the process was killed by a signal. Captured stderr is
    /// included in the message.
    pub(crate) async fn wait_exit_error(&mut self) -> Option<ClaudeAgentError> {
        let status = match self.child.wait().await {
            Ok(s) => s,
            Err(e) => return Some(ClaudeAgentError::Io(e)),
        };

        if status.success() {
            return None;
        }

        let stderr = self
            .stderr_buf
            .lock()
            .ok()
            .map(|b| b.clone())
            .unwrap_or_default();

        let head = match status.code() {
            Some(code) => format!("Claude process exited with code {code}"),
            None => "Claude process terminated by signal".to_string(),
        };
        let msg = if stderr.is_empty() {
            head
        } else {
            format!("{head}\nstderr: {stderr}")
        };

        Some(ClaudeAgentError::Process(msg))
    }

    /// Kill the subprocess (best-effort; errors are ignored).
    pub(crate) async fn kill(&mut self) {
        let _ = self.child.kill().await;
    }
}

/// Write one user turn to the subprocess stdin as a stream-json line.
pub(crate) async fn write_user_turn(stdin: &mut ChildStdin, text: &str) -> Result<()> {
    let msg = user_turn_json(text);
    let mut buf = serde_json::to_vec(&msg).map_err(|e| {
        ClaudeAgentError::Process(format!("failed to serialize stdin message: {e}"))
    })?;
    buf.push(b'\n');

    stdin.write_all(&buf).await.map_err(ClaudeAgentError::Io)?;
    stdin.flush().await.map_err(ClaudeAgentError::Io)?;
    Ok(())
}

fn user_turn_json(text: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "user",
        "message": {
            "role": "user",
            "content": [{"type": "text", "text": text}]
        }
    })
}

// ─── Command builder ──────────────────────────────────────────────────────

fn build_command(opts: &SessionOptions) -> Command {
    let exe = opts.path_to_executable.as_deref().unwrap_or("claude");
    let mut cmd = Command::new(exe);

    cmd.arg("--output-format")
        .arg("stream-json")
        .arg("--verbose")
        .arg("--input-format")
        .arg("stream-json");

    if let Some(model) = &opts.model {
        cmd.arg("--model").arg(model);
    }

    if let Some(max_turns) = opts.max_turns {
        cmd.arg("--max-turns").arg(max_turns.to_string());
    }

    if !opts.allowed_tools.is_empty() {
        cmd.arg("--allowed-tools").args(&opts.allowed_tools);
    }

    if opts.permission_mode != PermissionMode::Default {
        cmd.arg("--permission-mode")
            .arg(opts.permission_mode.as_str());
    }

    if let Some(sp) = &opts.system_prompt {
        cmd.arg("--system-prompt").arg(sp);
    }

    if let Some(cwd) = &opts.cwd {
        cmd.current_dir(cwd);
    }

    cmd
}
