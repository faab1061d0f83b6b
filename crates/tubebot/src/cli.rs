use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tubefetch")]
#[command(author, version, about = "Telegram bot that downloads YouTube videos in a size that fits the chat", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Run the bot (long polling)
    Run,

    /// Show the formats a link would offer
    Info {
        /// YouTube link
        url: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Download a link without Telegram, using the same size fallback
    Download {
        /// YouTube link
        url: String,

        /// Format id to start from (as shown by `info`)
        #[arg(short, long, conflicts_with = "audio")]
        format: Option<String>,

        /// Download audio only
        #[arg(long)]
        audio: bool,

        /// Directory to move the finished file into
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
