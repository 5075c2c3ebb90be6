//! Unix domain socket transport

use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::net::UnixStream;

use super::{Transport, TransportKind};
use crate::protocol::LineBuffer;
use crate::IpcError;

/// Size of each `read` from the socket
const READ_CHUNK_SIZE: usize = 4096;

/// Expand `~` and `$VARS` in a socket path.
///
/// Unset variables are left in place; the ones that are set still expand.
pub fn expand_socket_path(path: &str) -> PathBuf {
    let home_expanded = shellexpand::tilde(path);
    let expanded = shellexpand::full_with_context_no_errors(
        &*home_expanded,
        || None::<String>,
        |var| std::env::var(var).ok(),
    );
    PathBuf::from(expanded.into_owned())
}

/// Line-oriented connection over a stream socket
///
/// Incoming bytes are accumulated until a `\n` shows up; anything after the
/// first line stays buffered for the next `read_line`.
#[derive(Debug)]
pub struct SocketTransport<S> {
    stream: Option<S>,
    buffer: LineBuffer,
    path: PathBuf,
}

#[cfg(unix)]
impl SocketTransport<UnixStream> {
    /// Connect to the socket at `path` after expanding `~` and `$VARS`.
    ///
    /// # Errors
    ///
    /// Returns `IpcError::TransportUnavailable` if nothing is listening there.
    pub fn connect(path: &str) -> Result<Self, IpcError> {
        let expanded = expand_socket_path(path);
        let stream =
            UnixStream::connect(&expanded).map_err(|source| IpcError::TransportUnavailable {
                path: expanded.clone(),
                source,
            })?;

        tracing::debug!("Connected to mpv socket {}", expanded.display());
        Ok(Self::from_stream(stream, expanded))
    }
}

impl<S: Read + Write> SocketTransport<S> {
    /// Wrap an already connected stream.
    pub fn from_stream(stream: S, path: impl Into<PathBuf>) -> Self {
        Self {
            stream: Some(stream),
            buffer: LineBuffer::new(),
            path: path.into(),
        }
    }

    /// The expanded socket path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn stream(&mut self) -> Result<&mut S, IpcError> {
        self.stream.as_mut().ok_or(IpcError::ConnectionClosed)
    }
}

impl<S: Read + Write> Transport for SocketTransport<S> {
    fn kind(&self) -> TransportKind {
        TransportKind::Socket
    }

    fn write_line(&mut self, line: &str) -> Result<(), IpcError> {
        let stream = self.stream()?;
        stream
            .write_all(line.trim_end().as_bytes())
            .map_err(IpcError::SendFailed)?;
        stream.write_all(b"\n").map_err(IpcError::SendFailed)?;
        stream.flush().map_err(IpcError::SendFailed)
    }

    fn read_line(&mut self) -> Result<String, IpcError> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        loop {
            if let Some(line) = self.buffer.next_line() {
                return Ok(line);
            }

            let bytes_read = match self.stream()?.read(&mut chunk) {
                Ok(0) => return Err(IpcError::ConnectionClosed),
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(IpcError::ReceiveFailed(e)),
            };

            self.buffer.push(&chunk[..bytes_read]);
        }
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!(
                "Closed mpv socket {} ({} unread bytes dropped)",
                self.path.display(),
                self.buffer.pending().len()
            );
            self.buffer = LineBuffer::new();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Stream that hands out pre-cut chunks, one per `read`.
    struct ChunkedStream {
        chunks: VecDeque<Vec<u8>>,
        written: Vec<u8>,
        writes: usize,
    }

    impl ChunkedStream {
        fn new(chunks: &[&[u8]]) -> Self {
            Self {
                // An empty read means end of stream, so empty chunks are dropped.
                chunks: chunks
                    .iter()
                    .filter(|c| !c.is_empty())
                    .map(|c| c.to_vec())
                    .collect(),
                written: Vec::new(),
                writes: 0,
            }
        }
    }

    impl Read for ChunkedStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.chunks.pop_front() {
                Some(chunk) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                None => Ok(0),
            }
        }
    }

    impl Write for ChunkedStream {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.writes += 1;
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_read_line_any_split() {
        let stream = b"abc\ndef\n";
        for split in 0..=stream.len() {
            let chunks = ChunkedStream::new(&[&stream[..split], &stream[split..]]);
            let mut transport = SocketTransport::from_stream(chunks, "/tmp/mpv-socket");

            assert_eq!(transport.read_line().unwrap(), "abc", "split at {}", split);
            assert_eq!(transport.read_line().unwrap(), "def", "split at {}", split);
            assert!(matches!(
                transport.read_line(),
                Err(IpcError::ConnectionClosed)
            ));
        }
    }

    #[test]
    fn test_read_line_byte_by_byte() {
        let bytes: Vec<&[u8]> = b"{\"error\":\"success\"}\n"
            .chunks(1)
            .collect();
        let mut transport = SocketTransport::from_stream(ChunkedStream::new(&bytes), "sock");
        assert_eq!(transport.read_line().unwrap(), r#"{"error":"success"}"#);
    }

    #[test]
    fn test_write_line_sends_terminator_separately() {
        let mut transport = SocketTransport::from_stream(ChunkedStream::new(&[]), "sock");
        transport.write_line("run shell.exe ...  \n").unwrap();

        let stream = transport.stream.as_ref().unwrap();
        assert_eq!(stream.written, b"run shell.exe ...\n");
        assert_eq!(stream.writes, 2);
    }

    #[test]
    fn test_close_drops_buffer() {
        let mut transport =
            SocketTransport::from_stream(ChunkedStream::new(&[b"a\nb\n"]), "sock");
        assert_eq!(transport.read_line().unwrap(), "a");
        transport.close();
        assert!(matches!(
            transport.read_line(),
            Err(IpcError::ConnectionClosed)
        ));
    }

    #[test]
    fn test_expand_socket_path_home_and_vars() {
        std::env::set_var("MPV_NP_TEST_SOCKET_DIR", "/run/user/1000");
        assert_eq!(
            expand_socket_path("$MPV_NP_TEST_SOCKET_DIR/mpv"),
            PathBuf::from("/run/user/1000/mpv")
        );

        let expanded = expand_socket_path("~/mpv-socket");
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }

    #[test]
    fn test_expand_socket_path_unknown_var_kept() {
        assert_eq!(
            expand_socket_path("/tmp/$MPV_NP_SURELY_UNSET_VAR/sock"),
            PathBuf::from("/tmp/$MPV_NP_SURELY_UNSET_VAR/sock")
        );
    }

    #[test]
    fn test_expand_socket_path_mixed_known_and_unknown_vars() {
        std::env::set_var("MPV_NP_TEST_RUNTIME_DIR", "/run/user/1000");
        assert_eq!(
            expand_socket_path("$MPV_NP_TEST_RUNTIME_DIR/$MPV_NP_SURELY_UNSET_VAR/sock"),
            PathBuf::from("/run/user/1000/$MPV_NP_SURELY_UNSET_VAR/sock")
        );
    }

    #[test]
    fn test_expand_socket_path_tilde_with_unknown_var() {
        let expanded = expand_socket_path("~/$MPV_NP_SURELY_UNSET_VAR/sock");
        let expanded = expanded.to_string_lossy();
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("/$MPV_NP_SURELY_UNSET_VAR/sock"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unix_socket_round_trip() {
        use std::io::{BufRead, BufReader};
        use std::os::unix::net::UnixListener;

        let temp_dir = tempfile::tempdir().unwrap();
        let socket_path = temp_dir.path().join("mpv-socket");
        let listener = UnixListener::bind(&socket_path).unwrap();

        let server = std::thread::spawn(move || {
            let (stream, _addr) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let mut writer = stream;
            writer.write_all(b"{\"event\":\"idle\"}\n{\"error\":").unwrap();
            writer.write_all(b"\"success\"}\n").unwrap();
            line
        });

        let mut transport = SocketTransport::connect(socket_path.to_str().unwrap()).unwrap();
        assert_eq!(transport.path(), socket_path);
        transport.write_line(r#"{"command":["get_version"]}"#).unwrap();
        assert_eq!(transport.read_line().unwrap(), r#"{"event":"idle"}"#);
        assert_eq!(transport.read_line().unwrap(), r#"{"error":"success"}"#);

        assert_eq!(server.join().unwrap(), "{\"command\":[\"get_version\"]}\n");
    }
}
