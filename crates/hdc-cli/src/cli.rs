use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "hdc",
    about = "Inspect and edit hierarchical data containers stored on disk",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to ./hdc.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Store a JSON document as a container
    Import(ImportArgs),
    /// Print a stored container as JSON
    Export(ExportArgs),
    /// Print a stored container as a tree
    Show(ShowArgs),
    /// Print one value by key, position or path
    Get(GetArgs),
    /// Set one value and write the container back
    Set(SetArgs),
    /// Mark a stored container read-only
    Lock(StoreArgs),
    /// Clear the read-only flag of a stored container
    Unlock(StoreArgs),
}

/// Location of a container: a store directory and a group inside it.
#[derive(Args, Clone, Debug)]
pub struct StoreArgs {
    /// Store directory
    pub store: PathBuf,
    /// Group path inside the store, e.g. `jobs/relax`
    #[arg(short, long)]
    pub group: Option<String>,
}

#[derive(Args)]
pub struct ImportArgs {
    /// JSON file to import
    pub json: PathBuf,
    #[command(flatten)]
    pub target: StoreArgs,
    /// Lock the container before writing it
    #[arg(long)]
    pub read_only: bool,
    /// Write the 0.1.0 layout
    #[arg(long)]
    pub legacy: bool,
}

#[derive(Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub target: StoreArgs,
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    #[command(flatten)]
    pub target: StoreArgs,
    /// Do not load values, only list them
    #[arg(long)]
    pub lazy: bool,
}

#[derive(Args)]
pub struct GetArgs {
    #[command(flatten)]
    pub target: StoreArgs,
    /// Key, position or `/`-separated path
    pub path: String,
}

#[derive(Args)]
pub struct SetArgs {
    #[command(flatten)]
    pub target: StoreArgs,
    /// Key, position or `/`-separated path
    pub path: String,
    /// New value as JSON
    pub value: String,
}
