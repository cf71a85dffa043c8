pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "sparky",
    about = "Sparky operator CLI",
    long_about = "Operate the Sparky lead-capture service: migrations, demo data, readiness checks, config inspection and a terminal chat client.",
    after_help = "Examples:\n  sparky doctor --json\n  sparky seed\n  sparky chat --url http://127.0.0.1:8001"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo leads (one per status); safe to run repeatedly")]
    Seed,
    #[command(about = "Run config, database and scripted conversation checks with timing details")]
    Smoke,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, admin token, DB connectivity and migration state")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Chat with a running sparky-server from the terminal")]
    Chat {
        #[arg(long, help = "Server base URL (defaults to the configured listen address)")]
        url: Option<String>,
        #[arg(long, help = "Reuse an existing chat session id")]
        session: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Smoke => commands::smoke::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Chat { url, session } => commands::chat::run(url, session),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
