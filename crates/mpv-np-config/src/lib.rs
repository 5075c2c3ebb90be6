//! Configuration parsing for mpv-np
//!
//! This crate reads the KDL configuration file: where mpv's IPC endpoint
//! lives, how long to wait for property expansion, and which templates the
//! now-playing announcement uses.

mod error;
mod model;
mod parser;

pub use error::ConfigError;
pub use model::*;
pub use parser::{load_config, parse_config, parse_config_str};
