//! The now-playing announcement
//!
//! Picks a template based on what mpv is playing, fills in the locally
//! formatted values, and lets mpv expand the rest. When mpv can't expand
//! templates on this transport, or the attempt times out, the legacy template
//! is filled with the media title instead.

use mpv_np_config::{AnnounceConfig, Config};
use mpv_np_ipc::{ExchangeFs, ExpandOptions, Expansion, IpcError, MpvClient, OsFs, Transport};

use crate::format::{pretty_bitrate, pretty_size};

/// What the announcement needs to know before expansion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaInfo {
    /// `None` for streams
    pub file_size: Option<u64>,
    pub file_format: Option<String>,
    pub audio_bitrate: Option<f64>,
}

impl MediaInfo {
    /// Query mpv for the properties the templates depend on.
    ///
    /// Properties mpv reports as unavailable come back as `None`.
    pub fn query<T: Transport>(mpv: &mut MpvClient<T>) -> Result<Self, IpcError> {
        Ok(Self {
            file_size: mpv.get_property_as("file-size")?,
            file_format: mpv.get_property_as("file-format")?,
            audio_bitrate: mpv.get_property_as("audio-bitrate")?,
        })
    }
}

/// The template matching `info`.
pub fn choose_template<'a>(announce: &'a AnnounceConfig, info: &MediaInfo) -> &'a str {
    let is_audio = info
        .file_format
        .as_deref()
        .is_some_and(|format| announce.is_audio_format(format));

    if is_audio {
        &announce.audio_template
    } else if info.file_size.is_none() {
        &announce.stream_template
    } else {
        &announce.video_template
    }
}

/// Replace `{size}`, `{format}` and `{bitrate}` in `template`.
pub fn fill_local(template: &str, info: &MediaInfo) -> String {
    let size = info
        .file_size
        .map(|bytes| pretty_size(bytes as f64))
        .unwrap_or_default();
    let format = info
        .file_format
        .as_deref()
        .map(str::to_uppercase)
        .unwrap_or_default();
    let bitrate = info.audio_bitrate.map(pretty_bitrate).unwrap_or_default();

    template
        .replace("{size}", &size)
        .replace("{format}", &format)
        .replace("{bitrate}", &bitrate)
}

/// Build the announcement line.
pub fn now_playing<T: Transport>(mpv: &mut MpvClient<T>, config: &Config) -> Result<String, IpcError> {
    now_playing_with(mpv, config, &OsFs)
}

/// [`now_playing`] with a custom filesystem for the expansion fallback.
pub fn now_playing_with<T: Transport, F: ExchangeFs + ?Sized>(
    mpv: &mut MpvClient<T>,
    config: &Config,
    fs: &F,
) -> Result<String, IpcError> {
    let info = MediaInfo::query(mpv)?;
    tracing::debug!(?info, "Queried media info");

    let template = fill_local(choose_template(&config.announce, &info), &info);
    let options = ExpandOptions {
        timeout: config.ipc.expand_timeout,
        poll_interval: config.ipc.poll_interval,
    };

    match mpv.expand_properties_with(&template, &options, fs)? {
        Expansion::Expanded(line) => return Ok(line),
        Expansion::TimedOut => {
            tracing::warn!(
                "Unable to expand property string - close and reopen the current file, \
                 or try again later. Falling back to the legacy template"
            );
        }
        Expansion::NotSupported => {
            tracing::debug!("Property expansion not supported, using legacy template");
        }
    }

    let title: Option<String> = mpv.get_property_as("media-title")?;
    Ok(config
        .announce
        .legacy_template
        .replace("{title}", title.as_deref().unwrap_or_default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpv_np_ipc::TransportKind;
    use std::collections::VecDeque;
    use std::io::Read;
    use std::path::{Path, PathBuf};

    /// Transport answering with canned lines
    struct FakeMpv {
        kind: TransportKind,
        replies: VecDeque<String>,
        sent: Vec<String>,
    }

    impl FakeMpv {
        fn new(kind: TransportKind, replies: &[&str]) -> Self {
            Self {
                kind,
                replies: replies.iter().map(|r| r.to_string()).collect(),
                sent: Vec::new(),
            }
        }
    }

    impl Transport for FakeMpv {
        fn kind(&self) -> TransportKind {
            self.kind
        }

        fn write_line(&mut self, line: &str) -> Result<(), IpcError> {
            self.sent.push(line.to_string());
            Ok(())
        }

        fn read_line(&mut self) -> Result<String, IpcError> {
            self.replies.pop_front().ok_or(IpcError::ConnectionClosed)
        }

        fn close(&mut self) {}
    }

    /// Exchange file that already holds `content` in UTF-16LE.
    struct ReadyFs {
        content: Option<String>,
    }

    impl ExchangeFs for ReadyFs {
        fn reserve_path(&self) -> std::io::Result<PathBuf> {
            Ok(PathBuf::from(r"C:\Temp\np.txt"))
        }

        fn exists(&self, _path: &Path) -> bool {
            self.content.is_some()
        }

        fn open(&self, _path: &Path) -> std::io::Result<Box<dyn Read>> {
            let bytes: Vec<u8> = self
                .content
                .as_deref()
                .unwrap_or_default()
                .encode_utf16()
                .flat_map(u16::to_le_bytes)
                .collect();
            Ok(Box::new(std::io::Cursor::new(bytes)))
        }

        fn remove(&self, _path: &Path) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn info(size: Option<u64>, format: Option<&str>, bitrate: Option<f64>) -> MediaInfo {
        MediaInfo {
            file_size: size,
            file_format: format.map(String::from),
            audio_bitrate: bitrate,
        }
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.announce.audio_template = "listening {format} {size} {bitrate}".to_string();
        config.announce.stream_template = "streaming ${media-title}".to_string();
        config.announce.video_template = "watching ${filename} {size}".to_string();
        config.announce.legacy_template = "playing {title}".to_string();
        config.ipc.expand_timeout = std::time::Duration::from_millis(20);
        config.ipc.poll_interval = std::time::Duration::from_millis(1);
        config
    }

    #[test]
    fn test_choose_template() {
        let announce = test_config().announce;
        assert_eq!(
            choose_template(&announce, &info(Some(1), Some("flac"), None)),
            announce.audio_template
        );
        assert_eq!(
            choose_template(&announce, &info(None, Some("hls"), None)),
            announce.stream_template
        );
        assert_eq!(
            choose_template(&announce, &info(Some(1), Some("matroska"), None)),
            announce.video_template
        );
    }

    #[test]
    fn test_fill_local() {
        let filled = fill_local(
            "listening {format} {size} {bitrate} ${media-title}",
            &info(Some(35_000_000), Some("flac"), Some(1_098_000.0)),
        );
        assert_eq!(filled, "listening FLAC 35.0MB 1098.0Kbps ${media-title}");
    }

    #[test]
    fn test_fill_local_missing_values() {
        assert_eq!(fill_local("[{size}|{bitrate}]", &MediaInfo::default()), "[|]");
    }

    #[test]
    fn test_socket_falls_back_to_legacy_template() {
        let mut mpv = MpvClient::new(FakeMpv::new(
            TransportKind::Socket,
            &[
                r#"{"error":"property unavailable"}"#,
                r#"{"error":"success","data":"hls"}"#,
                r#"{"error":"property unavailable"}"#,
                r#"{"error":"success","data":"Live Stream"}"#,
            ],
        ));

        let line = now_playing(&mut mpv, &test_config()).unwrap();
        assert_eq!(line, "playing Live Stream");
        assert_eq!(
            mpv.transport().sent,
            vec![
                r#"{"command":["get_property","file-size"]}"#,
                r#"{"command":["get_property","file-format"]}"#,
                r#"{"command":["get_property","audio-bitrate"]}"#,
                r#"{"command":["get_property","media-title"]}"#,
            ]
        );
    }

    #[test]
    fn test_pipe_uses_expanded_line() {
        let mut mpv = MpvClient::new(FakeMpv::new(
            TransportKind::Pipe,
            &[
                r#"{"error":"success","data":35000000}"#,
                r#"{"error":"success","data":"mp3"}"#,
                r#"{"error":"success","data":320000}"#,
            ],
        ));
        let fs = ReadyFs {
            content: Some("\u{feff}listening MP3 35.0MB 320.0Kbps\r\n".to_string()),
        };

        let line = now_playing_with(&mut mpv, &test_config(), &fs).unwrap();
        assert_eq!(line, "listening MP3 35.0MB 320.0Kbps");

        let helper = mpv.transport().sent.last().unwrap();
        assert!(
            helper.starts_with("run powershell.exe -Command \"'listening MP3 35.0MB 320.0Kbps'"),
            "unexpected helper command: {}",
            helper
        );
    }

    #[test]
    fn test_pipe_timeout_falls_back() {
        let mut mpv = MpvClient::new(FakeMpv::new(
            TransportKind::Pipe,
            &[
                r#"{"error":"success","data":1000}"#,
                r#"{"error":"success","data":"mp4"}"#,
                r#"{"error":"property unavailable"}"#,
                r#"{"error":"success","data":"Sintel"}"#,
            ],
        ));
        let fs = ReadyFs { content: None };

        let line = now_playing_with(&mut mpv, &test_config(), &fs).unwrap();
        assert_eq!(line, "playing Sintel");
    }

    #[test]
    fn test_missing_title_leaves_placeholder_empty() {
        let mut mpv = MpvClient::new(FakeMpv::new(
            TransportKind::Socket,
            &[
                r#"{"error":"success","data":1000}"#,
                r#"{"error":"success","data":"mp4"}"#,
                r#"{"error":"success"}"#,
                r#"{"error":"property unavailable"}"#,
            ],
        ));

        let line = now_playing(&mut mpv, &test_config()).unwrap();
        assert_eq!(line, "playing ");
    }
}
