//! Balance command - sign in and show the ledger balance

use anyhow::Result;
use colored::Colorize;

use super::{get_context, login};
use crate::output;
use wallet_core::{BalanceDisplay, LoginSummary, OperationResult};

pub async fn run(email: &str, demo: bool, json: bool) -> Result<()> {
    let client = get_context(demo)?;

    let outcome = match login(&client, email, json).await {
        Ok(outcome) => outcome,
        Err(e) if json => {
            output::print_json(&OperationResult::<()>::fail(&e))?;
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    let pb = if json {
        indicatif::ProgressBar::hidden()
    } else {
        output::spinner("Fetching balance...")
    };
    let result = client.ctx.balance_service.fetch_balance().await;
    pb.finish_and_clear();

    let display = BalanceDisplay::from_result(&result);
    if json {
        let envelope = OperationResult::from(result)
            .with_context("display", serde_json::to_value(&display)?)
            .with_context("user", serde_json::to_value(LoginSummary::from(&outcome))?);
        return output::print_json(&envelope);
    }

    println!("{} {}", "Wallet Balance:".bold(), output::format_balance(&display));
    Ok(())
}
