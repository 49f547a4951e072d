//! Parley CLI binary entry point.

use clap::Parser;
use parley::cli::chat::{run_chat, run_dialogs};
use parley::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.load_config() {
        Ok(config) => match &cli.command {
            Commands::Chat(args) => run_chat(config, args).await,
            Commands::Dialogs(args) => run_dialogs(&config, &args.command),
        },
        Err(err) => Err(err),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
