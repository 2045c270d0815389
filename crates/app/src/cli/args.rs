pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "keybox")]
#[command(about = "Manage an identity keypair and box values for many recipients")]
pub struct Args {
    /// Path to the keybox directory (defaults to ~/.keybox)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
