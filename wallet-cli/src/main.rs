//! Merchant wallet CLI - balance and transaction history in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{balance, config, dashboard, history};
use wallet_core::services::logging;

/// mw - merchant wallet client
#[derive(Parser)]
#[command(name = "mw", version, about, long_about = None)]
struct Cli {
    /// Run against the built-in mock wallet
    #[arg(long, global = true)]
    demo: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and show the wallet balance
    Balance {
        /// Email shown in the welcome line
        #[arg(long, env = "MW_EMAIL")]
        email: String,
    },

    /// Sign in and show one page of transactions
    History {
        #[arg(long, env = "MW_EMAIL")]
        email: String,
        /// Range start, YYYY-MM-DDTHH:MM
        #[arg(long)]
        start: String,
        /// Range end, YYYY-MM-DDTHH:MM (seconds are pinned to :59)
        #[arg(long)]
        end: String,
        /// Page number, starting at 1
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,
    },

    /// Interactive session: balance, history and paging
    Dashboard {
        #[arg(long, env = "MW_EMAIL")]
        email: Option<String>,
        #[arg(long, requires = "end")]
        start: Option<String>,
        #[arg(long, requires = "start")]
        end: Option<String>,
    },

    /// Inspect or change settings
    Config {
        #[command(subcommand)]
        command: config::ConfigCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let Cli {
        demo,
        json,
        command,
        ..
    } = cli;

    match command {
        Commands::Config { command } => config::run(command, json),
        command => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run_session(command, demo, json))
        }
    }
}

/// Commands that talk to the wallet API
async fn run_session(command: Commands, demo: bool, json: bool) -> Result<()> {
    match command {
        Commands::Balance { email } => balance::run(&email, demo, json).await,
        Commands::History {
            email,
            start,
            end,
            page,
        } => history::run(&email, &start, &end, page, demo, json).await,
        Commands::Dashboard { email, start, end } => {
            if json {
                anyhow::bail!("dashboard is interactive and has no JSON output");
            }
            dashboard::run(email, start, end, demo).await
        }
        Commands::Config { command } => config::run(command, json),
    }
}
