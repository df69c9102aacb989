//! Output formatting utilities

use std::time::Duration;

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, CellAlignment, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use serde::Serialize;

use wallet_core::{BalanceDisplay, OperationResult, TransactionRecord};

const CURRENCY_SYMBOL: &str = "₦";

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Print an operation result as pretty JSON
pub fn print_json<T: Serialize>(result: &OperationResult<T>) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}

/// Spinner on stderr while a request is in flight; hidden when not a terminal
pub fn spinner(msg: &str) -> ProgressBar {
    if atty::isnt(atty::Stream::Stderr) {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn format_amount(amount: Decimal) -> String {
    format!("{}{}", CURRENCY_SYMBOL, amount)
}

/// Balance line; an unavailable balance shows as zero with the reason
pub fn format_balance(balance: &BalanceDisplay) -> String {
    match balance {
        BalanceDisplay::Available { amount } => format_amount(*amount).bold().to_string(),
        BalanceDisplay::Unavailable { reason } => format!(
            "{} {}",
            format_amount(Decimal::ZERO).bold(),
            format!("(unavailable: {})", reason).yellow()
        ),
    }
}

pub fn print_records(records: &[TransactionRecord]) {
    let mut table = create_table();
    table.set_header(vec!["Description", "Amount", "Time"]);
    for record in records {
        table.add_row(vec![
            Cell::new(&record.description),
            Cell::new(format_amount(record.amount)).set_alignment(CellAlignment::Right),
            Cell::new(&record.occurred_at),
        ]);
    }
    println!("{}", table);
}

/// History body: XML payload, record table, or the empty message
pub fn print_history(records: &[TransactionRecord], raw_xml: Option<&str>) {
    if let Some(xml) = raw_xml {
        println!("{}", "XML Response:".bold());
        println!("{}", xml);
    } else if records.is_empty() {
        println!("No transactions found.");
    } else {
        print_records(records);
    }
}
