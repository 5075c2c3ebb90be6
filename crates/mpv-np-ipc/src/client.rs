//! mpv IPC client implementation
//!
//! `MpvClient` owns exactly one transport connection and runs strictly
//! sequential request/response exchanges over it. The connection is closed
//! when the client is dropped.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::protocol::{parse_result_line, MpvCommand};
use crate::transport::{self, Endpoint, Platform, Transport};
use crate::IpcError;

/// Blocking client for mpv's JSON IPC
///
/// # Correlation
///
/// mpv's replies are matched to commands purely by arrival order: after
/// sending a command the client discards every line without an `error` field
/// (events) and takes the first one that has it. Only one command may be in
/// flight per connection, which `&mut self` enforces for a single client.
/// Never share the underlying endpoint with another writer.
///
/// # Example
///
/// ```ignore
/// let mut mpv = MpvClient::connect(&Endpoint::for_platform(Platform::current(), "/tmp/mpv-socket"))?;
/// let size = mpv.get_property("file-size")?;
/// ```
pub struct MpvClient<T: Transport = Box<dyn Transport>> {
    transport: T,
}

impl MpvClient {
    /// Connect to `endpoint` with the matching transport.
    ///
    /// # Errors
    ///
    /// Returns `IpcError::TransportUnavailable` if mpv is not listening.
    pub fn connect(endpoint: &Endpoint) -> Result<Self, IpcError> {
        Ok(Self::new(transport::connect(endpoint)?))
    }

    /// Connect to `path` with the transport native to this platform.
    pub fn connect_for_platform(path: &str) -> Result<Self, IpcError> {
        Self::connect(&Endpoint::for_platform(Platform::current(), path))
    }
}

impl<T: Transport> MpvClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run `name` with `params` and wait for its result.
    ///
    /// Returns the `data` field of the result line; `None` when mpv sent no
    /// data or `null`.
    ///
    /// # Errors
    ///
    /// Returns `IpcError::Protocol` if mpv reports a non-success status (see
    /// [`IpcError::is_property_unavailable`]), or any transport error.
    pub fn command<I>(&mut self, name: &str, params: I) -> Result<Option<Value>, IpcError>
    where
        I: IntoIterator<Item = Value>,
    {
        self.send(&MpvCommand::new(name, params))
    }

    /// Send a prepared command and wait for its result.
    pub fn send(&mut self, command: &MpvCommand) -> Result<Option<Value>, IpcError> {
        let line = command.encode()?;
        tracing::debug!("Sending mpv command: {}", line);
        self.transport.write_line(&line)?;

        loop {
            let reply = self.transport.read_line()?;
            if let Some(result) = parse_result_line(&reply) {
                tracing::debug!("mpv result: {}", reply);
                return result.into_result();
            }
        }
    }

    /// Read a property.
    pub fn get_property(&mut self, name: &str) -> Result<Option<Value>, IpcError> {
        self.send(&MpvCommand::get_property(name))
    }

    /// Read a property and deserialize it.
    ///
    /// `property unavailable` is not an error here: it yields `Ok(None)`,
    /// like a property without data.
    ///
    /// # Errors
    ///
    /// Returns `IpcError::UnexpectedData` if the value has the wrong shape.
    pub fn get_property_as<D: DeserializeOwned>(
        &mut self,
        name: &str,
    ) -> Result<Option<D>, IpcError> {
        let data = match self.get_property(name) {
            Ok(data) => data,
            Err(e) if e.is_property_unavailable() => {
                tracing::debug!("Property {} unavailable", name);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        data.map(serde_json::from_value)
            .transpose()
            .map_err(|source| IpcError::UnexpectedData {
                command: format!("get_property {}", name),
                source,
            })
    }

    /// Send an input.conf-style command line verbatim. No reply is read.
    pub fn input_command(&mut self, command: &str) -> Result<(), IpcError> {
        tracing::debug!("Sending mpv input command: {}", command);
        self.transport.write_line(command)
    }

    /// Close the connection. Dropping the client does the same.
    pub fn close(&mut self) {
        self.transport.close();
    }
}

impl<T: Transport> Drop for MpvClient<T> {
    fn drop(&mut self) {
        self.transport.close();
    }
}
