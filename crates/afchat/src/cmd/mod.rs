use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::{io_error, CliResult};
use crate::output::OutputFormat;

pub mod decode;
pub mod resolve;
pub mod version;
pub mod watch;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Join a broadcast's chat and print messages until stopped.
    Watch(WatchArgs),
    /// Resolve a broadcast URL to its chat endpoint.
    Resolve(ResolveArgs),
    /// Decode and classify one raw chat frame.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Watch(args) => watch::run(args, format),
        Command::Resolve(args) => resolve::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Broadcast URL, e.g. https://play.afreecatv.com/<bjid>/<broadcast-no>.
    pub url: String,
    /// Stop after N chat messages.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub count: Option<u64>,
    /// Directory for chat logs. Default: chat_logs next to the executable.
    #[arg(long, value_name = "DIR", env = "AFCHAT_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
    /// Do not write a chat log.
    #[arg(long, conflicts_with = "log_dir")]
    pub no_log: bool,
    /// Verify the chat server certificate against the bundled web PKI roots.
    #[arg(long)]
    pub verify_tls: bool,
    /// Live API endpoint override.
    #[arg(long, value_name = "URL", env = "AFCHAT_API_URL")]
    pub api_url: Option<String>,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Broadcast URL.
    pub url: String,
    /// Live API endpoint override.
    #[arg(long, value_name = "URL", env = "AFCHAT_API_URL")]
    pub api_url: Option<String>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame bytes as hex.
    #[arg(long, required_unless_present = "file", conflicts_with = "file")]
    pub hex: Option<String>,
    /// Read raw frame bytes from a file.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Multi-threaded runtime for commands that talk to the network.
pub(crate) fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("runtime setup failed", err))
}
