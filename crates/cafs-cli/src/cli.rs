use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cafs",
    about = "Content-addressed file system: write trees, inspect objects",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Block store directory (overrides the config file)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Config file (default: ./cafs.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a local file or directory into the store
    Write(WriteArgs),
    /// Print the content of a stored object
    Cat(TargetArgs),
    /// List the links of a directory node
    Ls(TargetArgs),
    /// Check whether an object is present
    Has(KeyArgs),
    /// Pin an object
    Pin(PinArgs),
    /// Remove a pin
    Unpin(PinArgs),
    /// Classify a path string
    Kind(PathArgs),
    /// Make a path absolute
    Abs(PathArgs),
    /// Print the effective configuration
    Config,
}

#[derive(Args)]
pub struct WriteArgs {
    pub path: PathBuf,
    /// Recursively pin the written root
    #[arg(long)]
    pub pin: bool,
    /// Abort the write after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Args)]
pub struct KeyArgs {
    pub key: String,
}

#[derive(Args)]
pub struct TargetArgs {
    /// Object key, optionally followed by a path below it (`<key>/docs/a.txt`)
    pub target: String,
}

#[derive(Args)]
pub struct PinArgs {
    pub key: String,
    #[arg(short, long)]
    pub recursive: bool,
}

#[derive(Args)]
pub struct PathArgs {
    pub path: String,
}
