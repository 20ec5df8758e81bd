//! CLI argument definitions using clap derive

use crate::error::IhppError;
use crate::request::Header;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// ihpp - HTTP inspector client
///
/// Sends requests through the inspector, keeps their responses in a local
/// cache keyed by request fingerprint, and follows live session updates.
#[derive(Parser, Debug)]
#[command(name = "ihpp")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "IHPP_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a request and cache its response
    Send(SendArgs),

    /// Show the cached state for a fingerprint
    Show(ShowArgs),

    /// Print the fingerprint of a request without sending it
    Hash(HashArgs),

    /// Manage the response cache
    Cache(CacheArgs),

    /// Print live messages for a topic until interrupted
    Watch(WatchArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Request description shared by `send` and `hash`
#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    /// HTTP method
    pub method: String,

    /// Target URL
    pub url: String,

    /// Request header, as 'Key: Value' (repeatable)
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<Header>,

    /// Request body
    #[arg(short = 'd', long = "data", default_value = "")]
    pub body: String,
}

/// Arguments for the send command
#[derive(Parser, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the show command
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Fingerprint printed by `send` or `hash`
    pub fingerprint: String,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the hash command
#[derive(Parser, Debug)]
pub struct HashArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// Send timestamp in milliseconds since the epoch
    #[arg(short, long)]
    pub timestamp: i64,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Count stored responses
    Count,

    /// Remove one stored response
    Delete {
        /// Fingerprint to remove
        fingerprint: String,
    },

    /// Remove every stored response
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the watch command
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Topic to follow
    #[arg(default_value = crate::live::SESSIONS_TOPIC)]
    pub topic: String,

    /// Print raw payloads instead of decoded session events
    #[arg(long)]
    pub raw: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable
    Table,
    /// JSON output
    Json,
}

fn parse_header(s: &str) -> Result<Header, IhppError> {
    s.parse()
}
