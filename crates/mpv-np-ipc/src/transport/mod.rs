//! Line-oriented transports to mpv's IPC endpoint
//!
//! mpv listens on a named pipe on Windows and on a Unix domain socket
//! everywhere else (`input-ipc-server`). Both are exposed through the
//! [`Transport`] trait; [`connect`] picks the implementation at runtime.

mod pipe;
mod socket;

#[cfg(test)]
pub(crate) mod scripted;

use crate::IpcError;

pub use pipe::PipeTransport;
pub use socket::{expand_socket_path, SocketTransport};

/// A blocking, line-oriented duplex connection.
///
/// Reads block until a full `\n`-terminated line arrives; there is no read
/// timeout. Closing the handle is the only way to give up on a silent peer.
pub trait Transport {
    /// Which kind of endpoint this is.
    fn kind(&self) -> TransportKind;

    /// Write `line` with trailing whitespace stripped, followed by one `\n`.
    fn write_line(&mut self, line: &str) -> Result<(), IpcError>;

    /// Read the next line, without its terminator.
    fn read_line(&mut self) -> Result<String, IpcError>;

    /// Release the underlying handle. Further I/O fails with
    /// [`IpcError::ConnectionClosed`]. Calling it twice is a no-op.
    fn close(&mut self);
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn kind(&self) -> TransportKind {
        (**self).kind()
    }

    fn write_line(&mut self, line: &str) -> Result<(), IpcError> {
        (**self).write_line(line)
    }

    fn read_line(&mut self) -> Result<String, IpcError> {
        (**self).read_line()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Host platform family, as far as mpv's IPC is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    /// The platform this binary runs on.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }
}

/// The two endpoint flavours mpv can expose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Windows named pipe, e.g. `\\.\pipe\mpvsocket`
    Pipe,
    /// Unix domain socket, e.g. `/tmp/mpv-socket`
    Socket,
}

impl TransportKind {
    /// The transport mpv uses on `platform`.
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Windows => TransportKind::Pipe,
            Platform::Unix => TransportKind::Socket,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TransportKind::Pipe => "pipe",
            TransportKind::Socket => "socket",
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Where to find mpv and how to talk to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub kind: TransportKind,
    /// Pipe name or socket path. Socket paths may contain `~` and `$VARS`.
    pub path: String,
}

impl Endpoint {
    pub fn new(kind: TransportKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// Endpoint of the transport native to `platform`.
    pub fn for_platform(platform: Platform, path: impl Into<String>) -> Self {
        Self::new(TransportKind::for_platform(platform), path)
    }
}

/// Open a connection to `endpoint`.
///
/// # Errors
///
/// Returns `IpcError::TransportUnavailable` if the path cannot be opened.
/// Returns `IpcError::UnsupportedTransport` when asking for a socket on a
/// platform without Unix domain sockets.
pub fn connect(endpoint: &Endpoint) -> Result<Box<dyn Transport>, IpcError> {
    tracing::debug!("Connecting to mpv {} at {}", endpoint.kind, endpoint.path);

    match endpoint.kind {
        TransportKind::Pipe => Ok(Box::new(PipeTransport::connect(&endpoint.path)?)),
        TransportKind::Socket => connect_socket(&endpoint.path),
    }
}

#[cfg(unix)]
fn connect_socket(path: &str) -> Result<Box<dyn Transport>, IpcError> {
    Ok(Box::new(SocketTransport::connect(path)?))
}

#[cfg(not(unix))]
fn connect_socket(_path: &str) -> Result<Box<dyn Transport>, IpcError> {
    Err(IpcError::UnsupportedTransport {
        kind: TransportKind::Socket.name(),
    })
}
