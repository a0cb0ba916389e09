//! Command line interface built on clap.
//!
//! [`Cli`] carries the global flags (`--verbose`, `--config`, `--log-format`)
//! and one [`Command`]: `demo` walks a sample workflow, `graph` serializes a
//! sample object graph.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::LogFormat;

/// Cycle-safe graph serialization and workflow history.
#[derive(Debug, Parser)]
#[command(name = "modelflow", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log output format, overriding the configuration file.
    #[arg(long, global = true)]
    pub log_format: Option<LogFormatArg>,

    /// Enable debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Walk a sample item through CREATED -> EMAILED -> CONSULTED -> PROVIDED.
    Demo {
        /// Actor recorded on each transition.
        #[arg(long, default_value = "demo")]
        actor: String,
    },

    /// Serialize the built-in sample library graph as JSON.
    Graph {
        /// Only keep these attributes (`Type.field`, repeatable).
        #[arg(long = "include")]
        include: Vec<String>,

        /// Drop these attributes (`Type.field`, repeatable).
        #[arg(long = "exclude")]
        exclude: Vec<String>,
    },
}
