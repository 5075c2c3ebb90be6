//! In-memory transport for unit tests

use std::collections::VecDeque;

use super::{Transport, TransportKind};
use crate::IpcError;

/// Replays canned inbound lines and records everything written.
#[derive(Debug)]
pub(crate) struct ScriptedTransport {
    pub kind: TransportKind,
    pub inbound: VecDeque<String>,
    pub written: Vec<String>,
    pub reads: usize,
    pub closed: bool,
}

impl ScriptedTransport {
    pub fn new(kind: TransportKind, inbound: &[&str]) -> Self {
        Self {
            kind,
            inbound: inbound.iter().map(|line| line.to_string()).collect(),
            written: Vec::new(),
            reads: 0,
            closed: false,
        }
    }
}

impl Transport for ScriptedTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn write_line(&mut self, line: &str) -> Result<(), IpcError> {
        if self.closed {
            return Err(IpcError::ConnectionClosed);
        }
        self.written.push(line.trim_end().to_string());
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, IpcError> {
        if self.closed {
            return Err(IpcError::ConnectionClosed);
        }
        self.reads += 1;
        self.inbound.pop_front().ok_or(IpcError::ConnectionClosed)
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
