//! Blocking client for mpv's JSON IPC
//!
//! mpv exposes a line-delimited JSON protocol on the endpoint configured with
//! `input-ipc-server`: a named pipe on Windows, a Unix domain socket
//! elsewhere. This crate provides:
//!
//! - `Transport`: the two endpoint flavours behind one trait
//! - `MpvClient`: sequential command/response exchanges and raw input commands
//! - `MpvClient::expand_properties`: the helper-process workaround for
//!   expanding property strings, which mpv's IPC can't do natively
//!
//! ## Protocol
//!
//! Commands go out as `{"command": ["get_property", "media-title"]}` plus a
//! newline. mpv answers with `{"error": "success", "data": ...}`; lines
//! without an `error` field are events and are skipped.

mod client;
mod error;
mod expand;
pub mod protocol;
pub mod transport;

pub use client::MpvClient;
pub use error::{IpcError, PROPERTY_UNAVAILABLE};
pub use expand::{
    helper_command, validate_template, ExchangeFs, ExpandOptions, Expansion, OsFs,
    DEFAULT_EXPAND_TIMEOUT, DEFAULT_POLL_INTERVAL,
};
pub use protocol::{MpvCommand, ResultLine};
pub use transport::{connect, Endpoint, Platform, Transport, TransportKind};
