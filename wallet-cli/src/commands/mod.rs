//! CLI command implementations

pub mod balance;
pub mod config;
pub mod dashboard;
pub mod history;

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;
use wallet_core::adapters::mock_wallet::{MockConfig, MockWalletServer};
use wallet_core::config::Config;
use wallet_core::{AuthOutcome, WalletContext};

use crate::output;

/// Get the client directory from environment or default
pub fn get_wallet_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("MW_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".merchant-wallet"))
        .context("Could not find home directory; set MW_DIR")
}

/// A wallet context plus the demo server it talks to, if any
pub struct Client {
    pub ctx: WalletContext,
    // Dropping it stops the server
    demo_server: Option<MockWalletServer>,
}

impl Client {
    pub fn is_demo(&self) -> bool {
        self.demo_server.is_some()
    }
}

/// Load config and build the context; `--demo` or `demoMode` points it at a
/// local mock server
pub fn get_context(demo: bool) -> Result<Client> {
    let wallet_dir = get_wallet_dir()?;
    let config = Config::load(&wallet_dir)
        .with_context(|| format!("Failed to load settings from {:?}", wallet_dir))?;

    if !(demo || config.demo_mode) {
        let ctx = WalletContext::new(config).context("Failed to initialize wallet client")?;
        return Ok(Client {
            ctx,
            demo_server: None,
        });
    }

    let server = MockWalletServer::start(MockConfig::default())
        .context("Failed to start demo server")?;
    info!(port = server.port(), "demo server started");

    let mut demo_config = Config::for_base_url(&server.base_url())
        .with_credentials(&server.config().api_key, &server.config().api_secret);
    demo_config.batch_size = config.batch_size;
    demo_config.timeout_secs = config.timeout_secs;
    demo_config.identity = config.identity.clone();

    let ctx = WalletContext::new(demo_config).context("Failed to initialize demo client")?;
    Ok(Client {
        ctx,
        demo_server: Some(server),
    })
}

/// Authenticate with a spinner; prints nothing on success in JSON mode
pub async fn login(client: &Client, email: &str, json: bool) -> wallet_core::Result<AuthOutcome> {
    let pb = if json {
        indicatif::ProgressBar::hidden()
    } else {
        output::spinner("Signing in...")
    };
    let result = client.ctx.login(email).await;
    pb.finish_and_clear();

    if let (Ok(outcome), false) = (&result, json) {
        if client.is_demo() {
            println!("{}", "Demo mode: using the built-in mock wallet".yellow());
        }
        println!("Welcome, {}", welcome_name(&outcome.user.email));
    }
    result
}

fn welcome_name(email: &str) -> &str {
    if email.trim().is_empty() {
        "Guest"
    } else {
        email
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_welcome_name_falls_back_to_guest() {
        assert_eq!(welcome_name(""), "Guest");
        assert_eq!(welcome_name("  "), "Guest");
        assert_eq!(welcome_name("a@b.c"), "a@b.c");
    }
}
