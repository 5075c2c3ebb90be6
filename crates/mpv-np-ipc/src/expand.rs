//! Property expansion through a helper process
//!
//! mpv's IPC has no request for "expand this property string"
//! (https://github.com/mpv-player/mpv/issues/3166). On Windows the client
//! works around it: mpv is asked to `run` powershell, which echoes the
//! template (expanded by mpv's own `run` argument handling) into a throwaway
//! file, and the client polls for that file.
//!
//! This is best-effort. It assumes a single writer and a single reader of the
//! exchange file, and that powershell finishes within the timeout (a few
//! hundred milliseconds is typical). Treat a [`Expansion::TimedOut`] result as
//! routine and fall back to plain property queries.

use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::transport::{Transport, TransportKind};
use crate::{IpcError, MpvClient};

/// Default time to wait for the helper's output
pub const DEFAULT_EXPAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Default pause between two polls of the exchange file
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Characters that can't survive the helper's quoting
const FORBIDDEN_CHARS: [char; 2] = ['\n', '\''];

/// UTF-16 byte-order mark written by powershell's `Out-File`
const BOM: char = '\u{feff}';

/// Outcome of a property expansion attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expansion {
    /// The template as mpv expanded it
    Expanded(String),
    /// The helper's output did not show up in time
    TimedOut,
    /// The transport has no way to expand templates
    NotSupported,
}

/// Tuning knobs for [`MpvClient::expand_properties`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandOptions {
    /// Upper bound on the total wait for the helper's output
    pub timeout: Duration,
    /// Sleep between polls
    pub poll_interval: Duration,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_EXPAND_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Filesystem operations the fallback needs
///
/// [`OsFs`] is the real filesystem; tests substitute scripted ones.
pub trait ExchangeFs {
    /// A path that is free right now. Nothing is left behind at that path.
    fn reserve_path(&self) -> std::io::Result<PathBuf>;

    fn exists(&self, path: &Path) -> bool;

    fn open(&self, path: &Path) -> std::io::Result<Box<dyn Read>>;

    fn remove(&self, path: &Path) -> std::io::Result<()>;
}

/// The real filesystem, with exchange files in the system temp directory
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl ExchangeFs for OsFs {
    fn reserve_path(&self) -> std::io::Result<PathBuf> {
        let file = tempfile::Builder::new()
            .prefix("mpv-np-")
            .suffix(".txt")
            .tempfile()?;
        let path = file.path().to_path_buf();
        // Deletes the file; only the unique name is kept.
        file.close()?;
        Ok(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn open(&self, path: &Path) -> std::io::Result<Box<dyn Read>> {
        Ok(Box::new(std::fs::File::open(path)?))
    }

    fn remove(&self, path: &Path) -> std::io::Result<()> {
        std::fs::remove_file(path)
    }
}

/// Removes the exchange file when dropped
struct ExchangeFile<'a, F: ExchangeFs + ?Sized> {
    fs: &'a F,
    path: PathBuf,
}

impl<F: ExchangeFs + ?Sized> Drop for ExchangeFile<'_, F> {
    fn drop(&mut self) {
        match self.fs.remove(&self.path) {
            Ok(()) => tracing::debug!("Removed exchange file {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "Failed to remove exchange file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// Reject templates that would break out of the helper's quoting.
///
/// # Errors
///
/// Returns `IpcError::InvalidTemplate` naming the first offending character.
pub fn validate_template(template: &str) -> Result<(), IpcError> {
    match template.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        Some(forbidden) => Err(IpcError::InvalidTemplate {
            template: template.to_string(),
            forbidden,
        }),
        None => Ok(()),
    }
}

/// The input command that makes mpv write the expanded `template` to `path`.
///
/// Backslashes in the path are doubled because mpv unescapes them inside
/// double quotes.
pub fn helper_command(template: &str, path: &Path) -> String {
    format!(
        r#"run powershell.exe -Command "'{}' | Out-File '{}'""#,
        template,
        path.to_string_lossy().replace('\\', "\\\\")
    )
}

/// First line of UTF-16LE `bytes`, once a newline has arrived.
///
/// A trailing odd byte is an incomplete code unit and is ignored.
fn decode_first_line(bytes: &[u8]) -> Option<String> {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let text = String::from_utf16_lossy(&units);
    let (line, _rest) = text.split_once('\n')?;

    Some(
        line.trim_start_matches(BOM)
            .trim_end_matches('\r')
            .to_string(),
    )
}

/// Wait for the helper's output at `path` until `deadline`.
fn poll_exchange_file<F: ExchangeFs + ?Sized>(
    fs: &F,
    path: &Path,
    deadline: Instant,
    poll_interval: Duration,
) -> Option<String> {
    let mut chunk = [0u8; 512];

    while Instant::now() < deadline {
        if !fs.exists(path) {
            std::thread::sleep(poll_interval);
            continue;
        }

        let mut reader = match fs.open(path) {
            Ok(reader) => reader,
            Err(e) => {
                tracing::debug!("Exchange file not readable yet: {}", e);
                std::thread::sleep(poll_interval);
                continue;
            }
        };

        // powershell may still be writing; keep reading until a full line is in.
        let mut buffer = Vec::new();
        while Instant::now() < deadline {
            match reader.read(&mut chunk) {
                Ok(0) => std::thread::sleep(poll_interval),
                Ok(n) => {
                    buffer.extend_from_slice(&chunk[..n]);
                    if let Some(line) = decode_first_line(&buffer) {
                        return Some(line);
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::debug!("Reading exchange file failed, reopening: {}", e);
                    break;
                }
            }
        }
    }

    None
}

impl<T: Transport> MpvClient<T> {
    /// Expand an mpv property string such as `"${media-title} [${time-pos}]"`.
    ///
    /// Only the pipe transport can do this; on a socket the call returns
    /// [`Expansion::NotSupported`] without touching anything.
    ///
    /// # Errors
    ///
    /// Returns `IpcError::InvalidTemplate` (before any I/O) if `template`
    /// contains a newline or a single quote, `IpcError::Exchange` if no
    /// temporary path could be reserved, or a transport error from sending
    /// the helper command.
    pub fn expand_properties(
        &mut self,
        template: &str,
        options: &ExpandOptions,
    ) -> Result<Expansion, IpcError> {
        self.expand_properties_with(template, options, &OsFs)
    }

    /// [`expand_properties`](Self::expand_properties) against a custom
    /// filesystem.
    pub fn expand_properties_with<F: ExchangeFs + ?Sized>(
        &mut self,
        template: &str,
        options: &ExpandOptions,
        fs: &F,
    ) -> Result<Expansion, IpcError> {
        if self.transport().kind() != TransportKind::Pipe {
            tracing::debug!("Property expansion not supported on the socket transport");
            return Ok(Expansion::NotSupported);
        }

        validate_template(template)?;

        let exchange = ExchangeFile {
            fs,
            path: fs.reserve_path().map_err(IpcError::Exchange)?,
        };
        let deadline = Instant::now() + options.timeout;

        self.input_command(&helper_command(template, &exchange.path))?;

        match poll_exchange_file(fs, &exchange.path, deadline, options.poll_interval) {
            Some(expanded) => {
                tracing::debug!("Expanded property string: {}", expanded);
                Ok(Expansion::Expanded(expanded))
            }
            None => {
                tracing::warn!(timeout = ?options.timeout, "Property expansion timed out");
                Ok(Expansion::TimedOut)
            }
        }
    }
}
