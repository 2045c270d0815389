// CLI modules
mod cli;
mod state;
mod version;

use clap::{Parser, Subcommand};
use cli::{args::Args, op::Op, BoxValue, Id, Init, Sign, Tag, Unbox, Verify, Version};

command_enum! {
    (Box, BoxValue),
    (Id, Id),
    (Init, Init),
    (Sign, Sign),
    (Tag, Tag),
    (Unbox, Unbox),
    (Verify, Verify),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let ctx = cli::op::OpContext::new(args.config_path);

    // An unreadable config still lets `init` and `version` run; the op reports it
    let level = ctx
        .config()
        .and_then(|config| config.level())
        .unwrap_or(tracing::Level::WARN);
    let guard = cli::logging::init_logging(level);

    let code = match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    // flush buffered log lines before exiting
    drop(guard);
    std::process::exit(code);
}
