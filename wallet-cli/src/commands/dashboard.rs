//! Dashboard command - interactive session over one login

use anyhow::Result;
use chrono::NaiveDateTime;
use colored::Colorize;
use dialoguer::{Confirm, Input, Select};

use super::{get_context, login, Client};
use crate::output;
use wallet_core::domain::transaction::parse_datetime_input;
use wallet_core::{AuthOutcome, BalanceDisplay, DashboardSnapshot, Error, HistoryView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuAction {
    ViewTransactions,
    Next,
    Previous,
    Refresh,
    ChangeDates,
    Logout,
    Quit,
}

impl MenuAction {
    fn label(&self) -> &'static str {
        match self {
            MenuAction::ViewTransactions => "View transactions",
            MenuAction::Next => "Next page",
            MenuAction::Previous => "Previous page",
            MenuAction::Refresh => "Refresh",
            MenuAction::ChangeDates => "Change dates",
            MenuAction::Logout => "Logout",
            MenuAction::Quit => "Quit",
        }
    }
}

/// Menu entries for the current view. Previous is hidden on page 1 and Next
/// once a page comes back empty.
fn menu_for(view: &HistoryView) -> Vec<MenuAction> {
    if view.query.is_none() {
        return vec![MenuAction::ViewTransactions, MenuAction::Refresh, MenuAction::Logout, MenuAction::Quit];
    }

    let mut actions = Vec::new();
    if view.can_go_forward() {
        actions.push(MenuAction::Next);
    }
    if view.can_go_back() {
        actions.push(MenuAction::Previous);
    }
    actions.extend([
        MenuAction::Refresh,
        MenuAction::ChangeDates,
        MenuAction::Logout,
        MenuAction::Quit,
    ]);
    actions
}

pub async fn run(email: Option<String>, start: Option<String>, end: Option<String>, demo: bool) -> Result<()> {
    let client = get_context(demo)?;

    let email = match email {
        Some(e) => e,
        None => Input::new()
            .with_prompt("Email")
            .allow_empty(true)
            .interact_text()?,
    };

    let range = match (start, end) {
        (Some(s), Some(e)) => Some((parse_datetime_input(&s)?, parse_datetime_input(&e)?)),
        (None, None) => None,
        _ => anyhow::bail!("--start and --end must be given together"),
    };

    loop {
        if login_with_retry(&client, &email).await?.is_none() {
            return Ok(());
        }

        match range {
            Some((start, end)) => render_dashboard(&client.ctx.load_dashboard(start, end).await),
            None => show_balance(&client).await,
        }

        match session_loop(&client).await? {
            SessionEnd::Quit => return Ok(()),
            SessionEnd::LoggedOut => {
                output::success("Logged out.");
                if !Confirm::new().with_prompt("Sign in again?").default(false).interact()? {
                    return Ok(());
                }
            }
        }
    }
}

enum SessionEnd {
    Quit,
    LoggedOut,
}

async fn session_loop(client: &Client) -> Result<SessionEnd> {
    loop {
        let view = client.ctx.history_service.view();
        let actions = menu_for(&view);
        let labels: Vec<&str> = actions.iter().map(MenuAction::label).collect();
        let choice = Select::new()
            .with_prompt(format!("Page {}", view.page))
            .items(&labels)
            .default(0)
            .interact()?;

        match actions[choice] {
            MenuAction::Next => render_history(&client.ctx.history_service.next().await),
            MenuAction::Previous => render_history(&client.ctx.history_service.previous().await),
            MenuAction::Refresh if view.query.is_some() => {
                render_dashboard(&client.ctx.refresh_dashboard().await)
            }
            MenuAction::Refresh => show_balance(client).await,
            MenuAction::ViewTransactions | MenuAction::ChangeDates => {
                let (start, end) = prompt_range()?;
                render_dashboard(&client.ctx.load_dashboard(start, end).await);
            }
            MenuAction::Logout => {
                client.ctx.logout();
                return Ok(SessionEnd::LoggedOut);
            }
            MenuAction::Quit => return Ok(SessionEnd::Quit),
        }
    }
}

/// Sign in, offering a retry on transient failures. `None` when the user
/// declines to retry.
async fn login_with_retry(client: &Client, email: &str) -> Result<Option<AuthOutcome>> {
    loop {
        match login(client, email, false).await {
            Ok(outcome) => return Ok(Some(outcome)),
            Err(e) if e.is_retryable() => {
                output::error(&e.to_string());
                if !Confirm::new().with_prompt("Retry?").default(true).interact()? {
                    return Ok(None);
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn prompt_range() -> Result<(NaiveDateTime, NaiveDateTime)> {
    loop {
        let start: String = Input::new()
            .with_prompt("Start (YYYY-MM-DDTHH:MM)")
            .interact_text()?;
        let end: String = Input::new()
            .with_prompt("End (YYYY-MM-DDTHH:MM)")
            .interact_text()?;

        match (parse_datetime_input(&start), parse_datetime_input(&end)) {
            (Ok(s), Ok(e)) if s <= e => return Ok((s, e)),
            (Ok(_), Ok(_)) => output::warning("Start must not be after end."),
            (Err(e), _) | (_, Err(e)) => output::warning(&e.to_string()),
        }
    }
}

async fn show_balance(client: &Client) {
    let balance = client.ctx.balance_service.fetch_balance().await;
    render_balance(&BalanceDisplay::from_result(&balance));
    println!("Choose a date range to view transactions.");
}

fn render_dashboard(snapshot: &DashboardSnapshot) {
    render_balance(&snapshot.balance);
    render_history(&snapshot.history);
}

fn render_balance(balance: &BalanceDisplay) {
    println!();
    println!("{} {}", "Wallet Balance:".bold(), output::format_balance(balance));
}

fn render_history(history: &wallet_core::Result<HistoryView>) {
    match history {
        Ok(view) => {
            println!();
            println!("{} (page {})", "Transaction History".bold(), view.page);
            output::print_history(&view.records, view.raw_xml.as_deref());
        }
        // A newer request owns the screen
        Err(Error::Cancelled) => {}
        Err(e) => {
            println!();
            println!("{}", "Transaction History".bold());
            output::error(&e.to_string());
            println!("No transactions found.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wallet_core::{TransactionQuery, TransactionRecord};
    use rust_decimal::Decimal;

    fn view_with(page: u32, records: usize) -> HistoryView {
        let start = parse_datetime_input("2024-01-01").unwrap();
        let end = parse_datetime_input("2024-01-31").unwrap();
        HistoryView {
            page,
            query: Some(TransactionQuery::new(start, end, page, 20).unwrap()),
            records: (0..records)
                .map(|i| TransactionRecord {
                    description: format!("tx {}", i),
                    amount: Decimal::ONE,
                    occurred_at: "2024-01-02".to_string(),
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_menu_before_search() {
        let actions = menu_for(&HistoryView::default());
        assert_eq!(actions[0], MenuAction::ViewTransactions);
        assert!(!actions.contains(&MenuAction::Next));
        assert!(!actions.contains(&MenuAction::Previous));
    }

    #[test]
    fn test_previous_hidden_on_first_page() {
        let actions = menu_for(&view_with(1, 20));
        assert!(actions.contains(&MenuAction::Next));
        assert!(!actions.contains(&MenuAction::Previous));
    }

    #[test]
    fn test_next_hidden_after_empty_page() {
        let actions = menu_for(&view_with(3, 0));
        assert!(!actions.contains(&MenuAction::Next));
        assert!(actions.contains(&MenuAction::Previous));
    }
}
