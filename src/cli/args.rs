//! CLI argument definitions using clap
//!
//! Commands:
//! - genomic-overlap serve --config <path>
//! - genomic-overlap query --config <path>
//! - genomic-overlap check-config --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Overlap joins across variant callers
#[derive(Parser, Debug)]
#[command(name = "genomic-overlap")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./genomic-overlap.json")]
        config: PathBuf,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run one overlap request read from stdin and exit
    Query {
        /// Path to configuration file
        #[arg(long, default_value = "./genomic-overlap.json")]
        config: PathBuf,
    },

    /// Validate a configuration file and print the effective settings
    CheckConfig {
        /// Path to configuration file
        #[arg(long, default_value = "./genomic-overlap.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
