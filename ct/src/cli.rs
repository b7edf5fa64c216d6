//! CLI command definitions and subcommands

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

/// channeltour - tokio channel walkthroughs
#[derive(Parser, Debug)]
#[command(
    name = "ct",
    version,
    about = "Channel fan-in, fan-out and pipeline walkthroughs",
    after_help = "Logs are written to: ~/.local/share/channeltour/logs/ct.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Demo to run (defaults to fan-in)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Merge two periodic producers through one select loop
    FanIn,

    /// Run workers concurrently and wait on a wait group
    FanOut,

    /// Stream greetings from a producer to a consumer
    Pipeline,

    /// Run pipeline, fan-out and fan-in in sequence
    All,

    /// List available demos
    List,
}

impl Command {
    /// Subcommands that run a single demo rather than orchestrate others
    fn is_demo(name: &str) -> bool {
        !matches!(name, "all" | "list" | "help")
    }

    /// Every runnable demo with its one-line description, taken from the CLI definition
    pub fn demos() -> Vec<(String, String)> {
        Cli::command()
            .get_subcommands()
            .filter(|sub| Self::is_demo(sub.get_name()))
            .map(|sub| {
                let about = sub.get_about().map(|about| about.to_string()).unwrap_or_default();
                (sub.get_name().to_string(), about)
            })
            .collect()
    }
}
