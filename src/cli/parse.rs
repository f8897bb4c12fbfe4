//! CLI parse: clap types for rx-context. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// rx-context CLI - ambient context propagation for reactive pipelines
#[derive(Parser, Debug)]
#[command(name = "rx-context")]
#[command(about = "Carry the assembly-time context into every subscription")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Assemble one computation per shape and show which context each subscription observed
    Demo {
        /// Run with the interceptor bound but disabled
        #[arg(long)]
        disable_propagation: bool,

        /// Number of labeled rounds, each subscribed from fresh threads
        #[arg(long, default_value = "1")]
        rounds: usize,
    },
    /// Print the effective settings as TOML
    Config,
}
