pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fastener")]
#[command(about = "Fastener CLI - operator tooling for the Fastener API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Set an account's password directly in the database")]
    ResetPassword {
        #[arg(long, default_value_t = 1, help = "Account id (defaults to the protected administrator)")]
        id: i32,

        #[arg(long, help = "New password; read from stdin when omitted")]
        password: Option<String>,
    },

    #[command(about = "Print the company or menu hierarchy")]
    Tree {
        #[arg(value_enum, help = "Which hierarchy to render")]
        kind: commands::tree::TreeKind,

        #[arg(long, help = "Read flat rows from a JSON file instead of the database")]
        input: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::ResetPassword { id, password } => {
            commands::account::reset_password(id, password, output_format).await
        }
        Commands::Tree { kind, input } => commands::tree::handle(kind, input, output_format).await,
    }
}
