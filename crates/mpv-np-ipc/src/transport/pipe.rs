//! Named-pipe transport (Windows)
//!
//! mpv's Windows IPC server is a byte-mode named pipe that can be opened like
//! a regular file. The handle is wrapped in a `BufReader` for line reads;
//! writes go straight to the inner handle.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use super::{Transport, TransportKind};
use crate::IpcError;

/// Duplex text stream over a pipe handle
#[derive(Debug)]
pub struct PipeTransport<S = File> {
    stream: Option<BufReader<S>>,
    path: PathBuf,
}

impl PipeTransport<File> {
    /// Open the pipe at `path` for reading and writing.
    ///
    /// # Errors
    ///
    /// Returns `IpcError::TransportUnavailable` if the pipe does not exist,
    /// has no server end, or access is denied.
    pub fn connect(path: impl AsRef<Path>) -> Result<Self, IpcError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| IpcError::TransportUnavailable {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::debug!("Opened mpv pipe {}", path.display());
        Ok(Self::from_stream(file, path))
    }
}

impl<S: Read + Write> PipeTransport<S> {
    /// Wrap an already open handle.
    pub fn from_stream(stream: S, path: impl Into<PathBuf>) -> Self {
        Self {
            stream: Some(BufReader::new(stream)),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn stream(&mut self) -> Result<&mut BufReader<S>, IpcError> {
        self.stream.as_mut().ok_or(IpcError::ConnectionClosed)
    }
}

impl<S: Read + Write> Transport for PipeTransport<S> {
    fn kind(&self) -> TransportKind {
        TransportKind::Pipe
    }

    fn write_line(&mut self, line: &str) -> Result<(), IpcError> {
        let writer = self.stream()?.get_mut();
        writer
            .write_all(line.trim_end().as_bytes())
            .and_then(|()| writer.write_all(b"\n"))
            .and_then(|()| writer.flush())
            .map_err(IpcError::SendFailed)
    }

    fn read_line(&mut self) -> Result<String, IpcError> {
        let mut bytes = Vec::new();
        let bytes_read = self
            .stream()?
            .read_until(b'\n', &mut bytes)
            .map_err(IpcError::ReceiveFailed)?;

        if bytes_read == 0 {
            return Err(IpcError::ConnectionClosed);
        }

        // Invalid UTF-8 is replaced, same as on the socket.
        let line = String::from_utf8_lossy(&bytes);
        Ok(line.trim_end_matches(['\n', '\r']).to_string())
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("Closed mpv pipe {}", self.path.display());
        }
    }
}
