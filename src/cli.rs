//! Command-line interface argument parsing
//!
//! Defines all CLI commands and their arguments using Clap.

use crate::config::{ChunkPolicy, Config};
use crate::output::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// GCDM client - fetch netCDF headers and variable data from a GCDM server
#[derive(Parser, Debug)]
#[command(name = "gcdm")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fetch netCDF headers and variable data from a remote GCDM server")]
#[command(long_about = concat!(
    "GCDM client (v", env!("CARGO_PKG_VERSION"), ")\n",
    "Connects to a GCDM gRPC server, requests a file header and the data of one\n",
    "variable, and prints the decoded result."
))]
pub struct Cli {
    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// GCDM server URL (overrides config file and GCDM_SERVER_URL)
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Connection timeout in seconds
    #[arg(long, global = true)]
    pub connect_timeout: Option<u64>,

    /// Per-call timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch and decode one variable of a remote file
    ///
    /// Examples:
    ///   gcdm fetch ./test/data/test.nc analysed_sst
    ///   gcdm fetch ./test/data/test.nc 'analysed_sst(0:0,:,:)' --format json
    ///   gcdm fetch ./test/data/test.nc analysed_sst --chunks first
    #[command(display_order = 1)]
    Fetch {
        /// File location on the server
        location: String,

        /// Variable name, optionally followed by a section
        variable: String,

        /// How to treat a multi-chunk data stream
        #[arg(long, value_enum)]
        chunks: Option<ChunkPolicy>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Write output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fetch only the header of a remote file
    ///
    /// Examples:
    ///   gcdm header ./test/data/test.nc
    #[command(display_order = 2)]
    Header {
        /// File location on the server
        location: String,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Write output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show or create the config file
    #[command(display_order = 3)]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Check CLI version
    #[command(display_order = 4)]
    Version,
}

/// Config file actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Apply explicitly given flags over file and env settings
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(server) = &self.server {
            config.server_url.clone_from(server);
        }
        if let Some(secs) = self.connect_timeout {
            config.connect_timeout_secs = secs;
        }
        if let Some(secs) = self.timeout {
            config.timeout_secs = secs;
        }
        if let Commands::Fetch {
            chunks: Some(policy),
            ..
        } = &self.command
        {
            config.chunk_policy = *policy;
        }
        if self.verbose {
            config.verbose = true;
        }
    }
}
