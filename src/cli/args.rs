//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sandock")]
#[command(author, version, about = "Run programs inside disposable or persistent containers", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: SubCommand,

    /// Main configuration file, takes precedence over SNDK_CFG and dot files
    #[arg(long, short, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose logging and full error reports
    #[arg(long, global = true)]
    pub debug: bool,

    /// Output format as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum SubCommand {
    /// List configured programs
    List,

    /// Print shell aliases for every program
    Alias {
        /// Also print one alias per program executable alias
        #[arg(long)]
        expand: bool,
    },

    /// Run a program inside its container
    Run {
        /// Program name as configured under `programs`
        program: String,

        /// Arguments for the program, `--sandbox-arg-KEY=VALUE` overrides included
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Manage sandock volumes
    Volume {
        #[command(subcommand)]
        action: VolumeAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum VolumeAction {
    /// List volumes created by sandock
    List,
}
