//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

/// Inspect the service registry, hook pipeline and permissions of a cmswire setup
#[derive(Parser, Debug)]
#[command(name = "cmswire")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug level, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Project directory holding cmswire.toml (default: cwd)
    #[arg(short = 'C', long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// List services and whether they are constructed
    Services,

    /// List hook events and their listeners
    Hooks,

    /// List discovered extensions and UIs
    Extensions,

    /// Show the permission snapshot of a user
    Acl {
        /// User id (default: the session user)
        #[arg(short, long)]
        user: Option<i64>,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Print a commented configuration template
    Template,
    /// Show config file locations
    Path,
}
