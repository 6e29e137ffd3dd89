//! CLI argument definitions using clap
//!
//! Commands:
//! - recordfinder serve --config <path>
//! - recordfinder find --config <path> <url>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// recordfinder - blueprint "find records" service
#[derive(Parser, Debug)]
#[command(name = "recordfinder")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the find action over HTTP and WebSocket
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./recordfinder.json")]
        config: PathBuf,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run a single find against the configured fixtures and exit
    Find {
        /// Path to configuration file
        #[arg(long, default_value = "./recordfinder.json")]
        config: PathBuf,

        /// Blueprint URL, e.g. "/user?limit=2&sort=name%20DESC"
        url: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
