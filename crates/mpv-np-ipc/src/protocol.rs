//! mpv JSON IPC wire format
//!
//! Outbound commands are one JSON object per line:
//! `{"command": ["get_property", "file-size"]}`. Inbound lines are either
//! result lines (carrying an `error` status and optional `data`) or events,
//! which this client ignores.
//!
//! Reference: https://mpv.io/manual/master/#json-ipc

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::IpcError;

/// Status string mpv uses for a successful command.
pub const SUCCESS: &str = "success";

/// Command sent to mpv.
#[derive(Debug, Clone, Serialize)]
pub struct MpvCommand {
    pub command: Vec<Value>,
}

impl MpvCommand {
    /// Build a command from its name and parameters, preserving order.
    pub fn new<I>(name: &str, params: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let mut command = vec![Value::String(name.to_string())];
        command.extend(params);
        Self { command }
    }

    /// Get a property value.
    pub fn get_property(name: &str) -> Self {
        Self::new("get_property", [name.into()])
    }

    /// Encode as a single JSON line, without the terminator.
    pub fn encode(&self) -> Result<String, IpcError> {
        serde_json::to_string(self).map_err(IpcError::SerializeFailed)
    }
}

/// A decoded result line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResultLine {
    /// "success" or an error message.
    pub error: String,
    /// Command-specific payload.
    #[serde(default)]
    pub data: Option<Value>,
}

impl ResultLine {
    /// Check if the command succeeded.
    pub fn is_success(&self) -> bool {
        self.error == SUCCESS
    }

    /// Turn the line into the command outcome.
    pub fn into_result(self) -> Result<Option<Value>, IpcError> {
        if self.is_success() {
            Ok(self.data.filter(|data| !data.is_null()))
        } else {
            Err(IpcError::Protocol { status: self.error })
        }
    }
}

/// Try to read `line` as a result line.
///
/// Returns `None` for events and anything else without an `error` string,
/// including lines that are not JSON at all.
pub fn parse_result_line(line: &str) -> Option<ResultLine> {
    let value: Value = match serde_json::from_str(line.trim()) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Skipping undecodable line from mpv: {} - {}", e, line);
            return None;
        }
    };

    if !value.get("error").is_some_and(Value::is_string) {
        tracing::debug!("Skipping non-result line: {}", line);
        return None;
    }

    serde_json::from_value(value).ok()
}

/// Byte accumulator that splits a chunked stream into `\n`-terminated lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a freshly received chunk.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Split off the first complete line, without its terminator.
    pub fn next_line(&mut self) -> Option<String> {
        let newline = self.buffer.iter().position(|&b| b == b'\n')?;
        let rest = self.buffer.split_off(newline + 1);
        let mut line = std::mem::replace(&mut self.buffer, rest);
        line.truncate(newline);
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Bytes received but not yet returned as a line.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }
}
