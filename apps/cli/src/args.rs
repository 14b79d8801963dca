//! # CLI Argument Definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Operator tool for link fixing rules.
#[derive(Debug, Parser)]
#[command(name = "linkfix")]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(arg_required_else_help = true)]
#[command(about = "Register URL fixer rules and apply them to text")]
pub struct Cli {
    /// Configuration file (TOML). Environment variables prefixed with LINKFIX__ override it.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Data file to use instead of the configured one
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: AppCommands,
}

#[derive(Debug, Subcommand)]
pub enum AppCommands {
    /// Fix the links in the given text and print the results
    Fix {
        #[arg(short, long)]
        namespace: String,
        /// Fix every link instead of only the first one
        #[arg(long)]
        all: bool,
        /// Text to scan; several arguments are joined with spaces
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Fix links in every line read from stdin until EOF or Ctrl+C
    Watch {
        #[arg(short, long)]
        namespace: String,
    },
    /// Run an administrative command, e.g. `run -n guild prepend-fixer domain=x.com prefix=vx`
    Run {
        #[arg(short, long)]
        namespace: String,
        /// Command name, see `linkfix commands`
        command: String,
        /// Options as key=value; a value of @path reads the file at path
        options: Vec<String>,
    },
    /// List the administrative commands
    Commands {},
    /// List namespaces that have rules
    Namespaces {},
}
