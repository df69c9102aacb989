//! Config command - inspect and update settings.json

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use super::get_wallet_dir;
use crate::output;
use wallet_core::config::Config;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show resolved settings (credentials shown as configured or not)
    Show,
    /// Set a setting, e.g. `batchSize 50` or `api.baseUrl https://...`
    Set {
        key: String,
        value: String,
    },
    /// Turn demo mode on or off
    Demo {
        #[arg(value_parser = ["on", "off"])]
        state: String,
    },
}

pub fn run(command: ConfigCommands, json: bool) -> Result<()> {
    let wallet_dir = get_wallet_dir()?;
    let mut config = Config::load(&wallet_dir)
        .with_context(|| format!("Failed to load settings from {:?}", wallet_dir))?;

    match command {
        ConfigCommands::Show => {
            let summary = config.summary();
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Setting", "Value"]);
            if let Some(map) = summary.as_object() {
                for (key, value) in map {
                    let shown = match value {
                        serde_json::Value::String(s) => s.clone(),
                        serde_json::Value::Null => "-".to_string(),
                        other => other.to_string(),
                    };
                    table.add_row(vec![key.as_str(), shown.as_str()]);
                }
            }
            println!("{}", table);
            println!("Settings file: {}", wallet_dir.join("settings.json").display());
        }
        ConfigCommands::Set { key, value } => {
            config.set(&key, &value)?;
            config.save(&wallet_dir)?;
            output::success(&format!("Set {} = {}", key, value));
        }
        ConfigCommands::Demo { state } => {
            if state == "on" {
                config.enable_demo_mode();
                config.save(&wallet_dir)?;
                println!("Demo mode is {}", "ON".green());
            } else {
                config.disable_demo_mode();
                config.save(&wallet_dir)?;
                println!("Demo mode is {}", "OFF".yellow());
            }
        }
    }

    Ok(())
}
