//! KDL configuration parser

use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::model::*;

/// Parse a configuration file from the given path
pub fn parse_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse the configuration file if there is one, defaults otherwise
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        tracing::debug!(
            "No configuration at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    parse_config(path)
}

/// Parse configuration from a string
pub fn parse_config_str(content: &str) -> Result<Config, ConfigError> {
    let doc: kdl::KdlDocument = content.parse().map_err(|e: kdl::KdlError| {
        // kdl uses an older miette version, so we need to extract offset/len manually
        let offset = e.span.offset();
        let len = e.span.len();
        let span = miette::SourceSpan::from((offset, len));
        ConfigError::ParseError {
            src: content.to_string(),
            span,
            source: e,
        }
    })?;

    let mut config = Config::default();

    for node in doc.nodes() {
        match node.name().value() {
            "global" => {
                config.global = parse_global(node)?;
            }
            "ipc" => {
                config.ipc = parse_ipc(node)?;
            }
            "announce" => {
                config.announce = parse_announce(node)?;
            }
            name => {
                tracing::warn!("Unknown top-level node: {}", name);
            }
        }
    }

    Ok(config)
}

/// First argument of `node` as a string
fn first_string<'a>(node: &'a kdl::KdlNode) -> Result<&'a str, ConfigError> {
    node.entries()
        .first()
        .and_then(|entry| entry.value().as_string())
        .ok_or_else(|| ConfigError::Invalid {
            message: format!("`{}` expects a string argument", node.name().value()),
        })
}

/// First argument of `node` as a positive number of milliseconds
fn first_millis(node: &kdl::KdlNode) -> Result<Duration, ConfigError> {
    let name = node.name().value();
    let value = node
        .entries()
        .first()
        .and_then(|entry| entry.value().as_i64())
        .ok_or_else(|| ConfigError::Invalid {
            message: format!("`{}` expects an integer number of milliseconds", name),
        })?;

    match u64::try_from(value) {
        Ok(millis) if millis > 0 => Ok(Duration::from_millis(millis)),
        _ => Err(ConfigError::Invalid {
            message: format!("`{}` must be greater than zero, got {}", name, value),
        }),
    }
}

fn parse_global(node: &kdl::KdlNode) -> Result<GlobalConfig, ConfigError> {
    let mut global = GlobalConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "log-level" => {
                    global.log_level = first_string(child)?
                        .parse()
                        .map_err(|message| ConfigError::Invalid { message })?;
                }
                name => {
                    tracing::warn!("Unknown global config option: {}", name);
                }
            }
        }
    }

    Ok(global)
}

fn parse_ipc(node: &kdl::KdlNode) -> Result<IpcSettings, ConfigError> {
    let mut ipc = IpcSettings::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "pipe-path" => ipc.pipe_path = first_string(child)?.to_string(),
                // Variables are expanded when connecting, only `~` here.
                "socket-path" => {
                    ipc.socket_path = shellexpand::tilde(first_string(child)?).into_owned()
                }
                "expand-timeout-ms" => ipc.expand_timeout = first_millis(child)?,
                "poll-interval-ms" => ipc.poll_interval = first_millis(child)?,
                name => {
                    tracing::warn!("Unknown ipc config option: {}", name);
                }
            }
        }
    }

    Ok(ipc)
}

fn parse_announce(node: &kdl::KdlNode) -> Result<AnnounceConfig, ConfigError> {
    let mut announce = AnnounceConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "audio-template" => announce.audio_template = first_string(child)?.to_string(),
                "stream-template" => announce.stream_template = first_string(child)?.to_string(),
                "video-template" => announce.video_template = first_string(child)?.to_string(),
                "legacy-template" => {
                    announce.legacy_template = first_string(child)?.to_string()
                }
                "audio-formats" => {
                    announce.audio_formats = child
                        .entries()
                        .iter()
                        .map(|entry| {
                            entry.value().as_string().map(str::to_lowercase).ok_or_else(|| {
                                ConfigError::Invalid {
                                    message: "`audio-formats` expects string arguments"
                                        .to_string(),
                                }
                            })
                        })
                        .collect::<Result<_, _>>()?;
                }
                name => {
                    tracing::warn!("Unknown announce config option: {}", name);
                }
            }
        }
    }

    Ok(announce)
}
