//! History command - sign in and show one page of transactions

use anyhow::{Context, Result};
use colored::Colorize;

use super::{get_context, login};
use crate::output;
use wallet_core::domain::transaction::parse_datetime_input;
use wallet_core::{LoginSummary, OperationResult, TransactionQuery};

pub async fn run(email: &str, start: &str, end: &str, page: u32, demo: bool, json: bool) -> Result<()> {
    let start = parse_datetime_input(start).context("Invalid --start")?;
    let end = parse_datetime_input(end).context("Invalid --end")?;

    let client = get_context(demo)?;
    let query = TransactionQuery::new(start, end, page, client.ctx.config.batch_size)?;

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
        output::spinner("Fetching transactions...")
    };
    let result = client.ctx.history_service.fetch_history(&query).await;
    pb.finish_and_clear();

    if json {
        let failed = result.is_err();
        let envelope = OperationResult::from(result)
            .with_context("user", serde_json::to_value(LoginSummary::from(&outcome))?);
        output::print_json(&envelope)?;
        if failed {
            std::process::exit(1);
        }
        return Ok(());
    }

    let history = result?;
    println!(
        "{} {} to {} (page {})",
        "Transaction History".bold(),
        query.start_header(),
        query.end_header(),
        history.page
    );
    output::print_history(&history.records, history.raw_xml.as_deref());
    if history.is_last_page() && !history.records.is_empty() {
        output::info("Last page.");
    }
    Ok(())
}
