use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "thumbox")]
#[command(about = "Thumbox CLI", long_about = None)]
pub struct Cli {
    /// Path to a configuration file (default: config/thumbox.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process a batch envelope of storage events
    Process(ProcessArgs),
    /// Resize a local image file into a thumbnail
    Resize(ResizeArgs),
}

#[derive(clap::Args, Debug)]
pub struct ProcessArgs {
    /// Envelope JSON file, or "-" to read from stdin
    #[arg(long, default_value = "-")]
    pub envelope: String,
}

#[derive(clap::Args, Debug)]
pub struct ResizeArgs {
    /// Input image file
    #[arg(long)]
    pub input: PathBuf,

    /// Output thumbnail file
    #[arg(long)]
    pub output: PathBuf,
}
