//! mpv-np CLI
//!
//! Prints a "now playing" line for the running mpv instance, and exposes the
//! raw IPC operations for scripting.

mod announce;
mod format;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use mpv_np_config::{Config, DEFAULT_CONFIG_PATH};
use mpv_np_ipc::{Endpoint, ExpandOptions, Expansion, IpcError, MpvClient, Platform, TransportKind};
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(name = "mpv-np")]
#[command(about = "Announce what mpv is playing, via its JSON IPC")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Pipe or socket path (overrides the configuration)
    #[arg(long)]
    ipc_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the now-playing line (default)
    Np,

    /// Print a property as JSON
    Get {
        /// Property name, e.g. `media-title`
        property: String,
    },

    /// Run an IPC command and print its result as JSON
    Command {
        /// Command name, e.g. `set_property`
        name: String,
        /// Arguments; valid JSON is sent as such, anything else as a string
        args: Vec<String>,
    },

    /// Send an input.conf-style command, e.g. `cycle pause`
    Input {
        line: String,
    },

    /// Expand an mpv property string such as `${media-title}`
    Expand {
        template: String,

        /// How long to wait for the expansion (overrides the configuration)
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Validate the configuration file
    Validate,
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // Expand tilde in config path
    let config_path: PathBuf = shellexpand::tilde(&cli.config).into_owned().into();
    let config = mpv_np_config::load_config(&config_path)?;

    // Logs go to stderr; stdout carries the output only
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(config.global.log_level.as_filter())
            }),
        )
        .init();

    let endpoint = endpoint(&config, cli.ipc_path);

    match cli.command.unwrap_or(Commands::Np) {
        Commands::Np => cmd_np(&config, &endpoint),
        Commands::Get { property } => cmd_get(&endpoint, &property),
        Commands::Command { name, args } => cmd_command(&endpoint, &name, &args),
        Commands::Input { line } => cmd_input(&endpoint, &line),
        Commands::Expand {
            template,
            timeout_ms,
        } => cmd_expand(&config, &endpoint, &template, timeout_ms),
        Commands::Validate => cmd_validate(&config_path),
    }
}

/// The endpoint for this platform, from the command line or the config.
fn endpoint(config: &Config, ipc_path: Option<String>) -> Endpoint {
    let platform = Platform::current();
    let use_pipe = TransportKind::for_platform(platform) == TransportKind::Pipe;
    let path = ipc_path.unwrap_or_else(|| config.ipc.endpoint_path(use_pipe).to_string());
    Endpoint::for_platform(platform, path)
}

/// Turn an IPC failure into a short diagnostic.
fn report(err: IpcError, endpoint: &Endpoint) -> miette::Report {
    tracing::debug!(error = ?err, "mpv IPC failed");

    if err.is_transport_unavailable() {
        miette::miette!(
            help = format!(
                "set `input-ipc-server={}` in your mpv.conf, or pass --ipc-path",
                endpoint.path
            ),
            "mpv IPC not running or bad configuration ({})",
            err
        )
    } else {
        miette::miette!("{}", err)
    }
}

fn connect(endpoint: &Endpoint) -> miette::Result<MpvClient> {
    MpvClient::connect(endpoint).map_err(|e| report(e, endpoint))
}

fn print_json(data: Option<Value>) {
    println!("{}", data.unwrap_or(Value::Null));
}

fn cmd_np(config: &Config, endpoint: &Endpoint) -> miette::Result<()> {
    let mut mpv = connect(endpoint)?;
    let line = announce::now_playing(&mut mpv, config).map_err(|e| report(e, endpoint))?;
    println!("{}", line);
    Ok(())
}

fn cmd_get(endpoint: &Endpoint, property: &str) -> miette::Result<()> {
    let mut mpv = connect(endpoint)?;
    match mpv.get_property(property) {
        Ok(data) => {
            print_json(data);
            Ok(())
        }
        Err(e) if e.is_property_unavailable() => {
            eprintln!("Property `{}` is not available for the current file", property);
            print_json(None);
            Ok(())
        }
        Err(e) => Err(report(e, endpoint)),
    }
}

/// Parse a command-line argument as JSON, or keep it as a string.
fn parse_arg(arg: &str) -> Value {
    serde_json::from_str(arg).unwrap_or_else(|_| Value::String(arg.to_string()))
}

fn cmd_command(endpoint: &Endpoint, name: &str, args: &[String]) -> miette::Result<()> {
    let mut mpv = connect(endpoint)?;
    let data = mpv
        .command(name, args.iter().map(|arg| parse_arg(arg)))
        .map_err(|e| report(e, endpoint))?;
    print_json(data);
    Ok(())
}

fn cmd_input(endpoint: &Endpoint, line: &str) -> miette::Result<()> {
    let mut mpv = connect(endpoint)?;
    mpv.input_command(line).map_err(|e| report(e, endpoint))
}

fn cmd_expand(
    config: &Config,
    endpoint: &Endpoint,
    template: &str,
    timeout_ms: Option<u64>,
) -> miette::Result<()> {
    let options = ExpandOptions {
        timeout: timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(config.ipc.expand_timeout),
        poll_interval: config.ipc.poll_interval,
    };

    let mut mpv = connect(endpoint)?;
    match mpv
        .expand_properties(template, &options)
        .map_err(|e| report(e, endpoint))?
    {
        Expansion::Expanded(line) => {
            println!("{}", line);
            Ok(())
        }
        Expansion::TimedOut => Err(miette::miette!(
            help = "close and reopen the current file, or try again later",
            "Property expansion timed out after {}ms",
            options.timeout.as_millis()
        )),
        Expansion::NotSupported => Err(miette::miette!(
            "Property expansion is not supported over the {} transport",
            endpoint.kind
        )),
    }
}

fn cmd_validate(config_path: &Path) -> miette::Result<()> {
    println!("Validating configuration: {}", config_path.display());

    match mpv_np_config::parse_config(config_path) {
        Ok(config) => {
            println!("Configuration is valid!");
            println!("  Log level: {}", config.global.log_level.as_filter());
            println!("  Pipe path: {}", config.ipc.pipe_path);
            println!("  Socket path: {}", config.ipc.socket_path);
            println!(
                "  Expand timeout: {}ms",
                config.ipc.expand_timeout.as_millis()
            );
            println!(
                "  Audio formats: {}",
                config.announce.audio_formats.join(", ")
            );
            Ok(())
        }
        Err(e) => Err(miette::miette!("{}", e)),
    }
}
