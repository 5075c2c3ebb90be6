//! Error types for mpv IPC operations

use std::path::PathBuf;
use thiserror::Error;

/// Status string mpv reports for a property that has no value for the
/// current media (e.g. `file-size` on a network stream).
pub const PROPERTY_UNAVAILABLE: &str = "property unavailable";

/// Errors that can occur when talking to mpv
#[derive(Debug, Error)]
pub enum IpcError {
    /// The pipe or socket could not be opened
    #[error("Failed to connect to mpv IPC at {path}: {source}")]
    TransportUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The requested transport does not exist on this platform
    #[error("The {kind} transport is not available on this platform")]
    UnsupportedTransport { kind: &'static str },

    /// Failed to write a line to mpv
    #[error("Failed to send to mpv: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Failed to read from mpv
    #[error("Failed to receive from mpv: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// mpv closed the connection while a line was expected
    #[error("Connection to mpv closed unexpectedly")]
    ConnectionClosed,

    /// Failed to serialize a command to JSON
    #[error("Failed to serialize command: {0}")]
    SerializeFailed(#[source] serde_json::Error),

    /// mpv answered with a non-success status
    #[error("mpv returned error: {status}")]
    Protocol { status: String },

    /// The result data did not have the expected shape
    #[error("Unexpected data for `{command}`: {source}")]
    UnexpectedData {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    /// The template can't be handed to the expansion helper
    #[error("Unsupported template {template:?}: may not contain {forbidden:?}")]
    InvalidTemplate { template: String, forbidden: char },

    /// The temporary exchange file could not be reserved
    #[error("Failed to reserve exchange file: {0}")]
    Exchange(#[source] std::io::Error),
}

impl IpcError {
    /// True when mpv reported that the property has no value right now.
    ///
    /// Callers treat this as "not applicable to the current media" rather
    /// than as a failure.
    pub fn is_property_unavailable(&self) -> bool {
        matches!(self, IpcError::Protocol { status } if status == PROPERTY_UNAVAILABLE)
    }

    /// True when the transport could not be opened at all, i.e. mpv is most
    /// likely not running or `input-ipc-server` points elsewhere.
    pub fn is_transport_unavailable(&self) -> bool {
        matches!(
            self,
            IpcError::TransportUnavailable { .. } | IpcError::UnsupportedTransport { .. }
        )
    }
}
