//! CLI for running agents against a scripted model.

pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Steploop CLI
#[derive(Parser, Debug)]
#[command(name = "steploop", version, about = "Run bounded tool-calling agent loops")]
pub struct Cli {
    /// Config file (defaults to $STEPLOOP_CONFIG or the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit JSON lines instead of human-readable output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the configured agents
    Agents,
    /// List the registered tools
    Tools,
    /// Run an agent on a prompt
    Run(RunArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Agent id
    #[arg(short, long, default_value = "code-agent")]
    pub agent: String,

    /// JSON file with the scripted model turns
    #[arg(short, long)]
    pub script: Option<PathBuf>,

    /// Override the step bound
    #[arg(long)]
    pub max_steps: Option<usize>,

    /// Skip the built-in tools' simulated latency
    #[arg(long)]
    pub fast: bool,

    /// User prompt
    pub prompt: String,
}
