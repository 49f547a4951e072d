//! CLI entry point for parley.

pub mod chat;
pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::ParleyConfig;
use crate::error::Result;

/// Parley: streaming chat with tool calling and persistent dialogs
#[derive(Parser, Debug)]
#[command(name = "parley", version, about = "Parley - turn-based chat client")]
pub struct Cli {
    /// Config file (defaults to ~/.parley/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive chat in the active dialog
    Chat(ChatArgs),
    /// Manage stored dialogs
    Dialogs(DialogsArgs),
}

/// Arguments for `parley chat`.
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Model name (overrides config)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Endpoint base URL (overrides config)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Dialog to resume
    #[arg(short, long)]
    pub dialog: Option<String>,

    /// System prompt for a new dialog
    #[arg(short, long)]
    pub system: Option<String>,

    /// Use the single-response protocol instead of streaming
    #[arg(long)]
    pub no_stream: bool,

    /// Ask the model for separate reasoning output
    #[arg(long)]
    pub think: bool,

    /// Offer the built-in tools to the model
    #[arg(long)]
    pub tools: bool,
}

#[derive(Args, Debug)]
pub struct DialogsArgs {
    #[command(subcommand)]
    pub command: DialogCommands,
}

#[derive(Subcommand, Debug)]
pub enum DialogCommands {
    /// List stored dialogs, most recent first
    List,
    /// Delete a dialog
    Delete {
        /// Dialog id
        id: String,
    },
}

impl Cli {
    /// Resolve configuration: explicit file or home config, then env.
    pub fn load_config(&self) -> Result<ParleyConfig> {
        match &self.config {
            Some(path) => Ok(ParleyConfig::from_file(path)?.apply_env()),
            None => ParleyConfig::load(),
        }
    }
}

impl ChatArgs {
    /// Apply command-line overrides on top of `config`.
    pub fn apply(&self, mut config: ParleyConfig) -> ParleyConfig {
        if let Some(model) = &self.model {
            config = config.with_model(model.clone());
        }
        if let Some(url) = &self.base_url {
            config = config.with_base_url(url.clone());
        }
        if self.no_stream {
            config = config.with_stream(false);
        }
        if self.think {
            config.think = Some(true);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_chat_with_defaults() {
        let cli = Cli::try_parse_from(["parley", "chat"]).unwrap();
        match cli.command {
            Commands::Chat(args) => {
                assert!(args.model.is_none());
                assert!(args.dialog.is_none());
                assert!(!args.no_stream);
                assert!(!args.tools);
            }
            other => panic!("expected Chat, got {other:?}"),
        }
    }

    #[test]
    fn chat_flags_override_config() {
        let cli = Cli::try_parse_from([
            "parley",
            "--config",
            "/tmp/p.toml",
            "chat",
            "-m",
            "qwen3",
            "--base-url",
            "http://gpu:11434",
            "--no-stream",
            "--think",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/tmp/p.toml")));
        let Commands::Chat(args) = cli.command else {
            panic!("expected Chat");
        };

        let config = args.apply(ParleyConfig::default());

        assert_eq!(config.model, "qwen3");
        assert_eq!(config.base_url, "http://gpu:11434");
        assert!(!config.stream);
        assert_eq!(config.think, Some(true));
    }

    #[test]
    fn parse_dialog_delete() {
        let cli = Cli::try_parse_from(["parley", "dialogs", "delete", "dlg_1"]).unwrap();
        match cli.command {
            Commands::Dialogs(DialogsArgs {
                command: DialogCommands::Delete { id },
            }) => assert_eq!(id, "dlg_1"),
            other => panic!("expected Dialogs delete, got {other:?}"),
        }
    }

    #[test]
    fn parse_missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["parley"]).is_err());
    }
}
