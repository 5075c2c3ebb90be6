//! Configuration data model

use std::time::Duration;

/// Default named pipe, matching `input-ipc-server=\\.\pipe\mpvsocket`
pub const DEFAULT_PIPE_PATH: &str = r"\\.\pipe\mpvsocket";

/// Default socket path; `~` and `$VARS` are expanded at connect time
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/mpv-socket";

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "~/.config/mpv-np/config.kdl";

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub global: GlobalConfig,
    pub ipc: IpcSettings,
    pub announce: AnnounceConfig,
}

/// Global settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalConfig {
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    /// Directive usable with `tracing_subscriber::EnvFilter`
    pub fn as_filter(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

/// How to reach mpv
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpcSettings {
    /// Named pipe used on Windows
    pub pipe_path: String,
    /// Unix domain socket used everywhere else
    pub socket_path: String,
    /// Upper bound on waiting for a property expansion
    pub expand_timeout: Duration,
    /// Pause between polls of the expansion exchange file
    pub poll_interval: Duration,
}

impl Default for IpcSettings {
    fn default() -> Self {
        Self {
            pipe_path: DEFAULT_PIPE_PATH.to_string(),
            socket_path: DEFAULT_SOCKET_PATH.to_string(),
            expand_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(10),
        }
    }
}

impl IpcSettings {
    /// The pipe path when `use_pipe` is set, the socket path otherwise.
    pub fn endpoint_path(&self, use_pipe: bool) -> &str {
        if use_pipe {
            &self.pipe_path
        } else {
            &self.socket_path
        }
    }
}

/// Templates for the now-playing line
///
/// `${...}` placeholders are mpv property expansions. `{size}`, `{format}`,
/// `{bitrate}` and `{title}` are filled in locally before mpv sees the
/// template. `\x02`, `\x03NN` and `\x0F` are IRC bold, colour and reset codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceConfig {
    /// Used when the file format is one of `audio_formats`
    pub audio_template: String,
    /// Used when mpv has no file size (network streams)
    pub stream_template: String,
    /// Used for everything else
    pub video_template: String,
    /// Used when property expansion isn't possible; only `{title}` is filled
    pub legacy_template: String,
    /// File formats (as reported by `file-format`) treated as audio
    pub audio_formats: Vec<String>,
}

impl Default for AnnounceConfig {
    fn default() -> Self {
        Self {
            audio_template: "me is listening to \x0307\x02${metadata/artist}\x0F - \
                \x0307\x02${media-title}\x0F • {size} • {format} {bitrate} • \
                ${audio-params/channel-count}ch • [${time-pos}${!duration==0: / ${duration}}] \
                playing in \x0306${mpv-version}\x0F"
                .to_string(),
            stream_template: "me is streaming: \x0307\x02${media-title}\x0F • \
                [${time-pos}${!duration==0: / ${duration}}] in \x0306${mpv-version}\x0F"
                .to_string(),
            video_template: "me is watching: \x0307\x02${filename}\x0F • {size} • \
                [${time-pos}${!duration==0: / ${duration}}] in \x0306${mpv-version}\x0F"
                .to_string(),
            legacy_template: "me is playing: {title} in mpv".to_string(),
            audio_formats: [
                "flac", "aac", "mp3", "ac3", "m4a", "opus", "wav", "wma", "webm", "floatp",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl AnnounceConfig {
    /// Whether `file_format` names an audio container.
    pub fn is_audio_format(&self, file_format: &str) -> bool {
        self.audio_formats
            .iter()
            .any(|format| format.eq_ignore_ascii_case(file_format))
    }
}
