//! Integration tests for wallet-core
//!
//! Every test runs the full flow through `WalletContext` against a real local
//! `MockWalletServer` (real TCP, real reqwest).
//!
//! Run with: cargo test --test integration_tests -- --nocapture

use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use tempfile::TempDir;

use wallet_core::adapters::ip_lookup::StaticIpResolver;
use wallet_core::adapters::memory_session::InMemorySessionStore;
use wallet_core::adapters::mock_wallet::{MockConfig, MockWalletServer};
use wallet_core::config::{Config, API_KEY_ENV, API_SECRET_ENV, BASE_URL_ENV, IP_LOOKUP_URL_ENV};
use wallet_core::domain::transaction::parse_datetime_input;
use wallet_core::ports::SessionStore;
use wallet_core::{BalanceDisplay, ErrorKind, OperationResult, WalletContext};

// ============================================================================
// Test Helpers
// ============================================================================

fn context_for(server: &MockWalletServer) -> WalletContext {
    let config = Config::for_base_url(&server.base_url())
        .with_credentials(&server.config().api_key, &server.config().api_secret);
    WalletContext::new(config).expect("Failed to create context")
}

fn january() -> (NaiveDateTime, NaiveDateTime) {
    (
        parse_datetime_input("2024-01-01T00:00").unwrap(),
        parse_datetime_input("2024-01-31T23:59").unwrap(),
    )
}

// ============================================================================
// Session Flow
// ============================================================================

#[tokio::test]
async fn test_login_balance_history_flow() {
    let server = MockWalletServer::start(MockConfig::default()).unwrap();
    let ctx = context_for(&server);

    let outcome = ctx.login("merchant@example.com").await.unwrap();
    assert!(ctx.is_authenticated());
    assert_eq!(outcome.user.role, "admin");

    let snapshot = ctx.balance_service.fetch_balance().await.unwrap();
    assert_eq!(snapshot.ledger_balance, Decimal::from_str("15250.75").unwrap());

    let (start, end) = january();
    let view = ctx.history_service.search(start, end).await.unwrap();
    assert_eq!(view.result_count(), 20);

    // Every authenticated call carries the issued token
    let token = outcome.session.token().to_string();
    for request in server.requests_to("/wallet/balance").iter().chain(server.requests_to("/history").iter()) {
        assert_eq!(request.header("sessionId"), Some(token.as_str()));
    }
}

#[tokio::test]
async fn test_operations_without_session_send_nothing() {
    let server = MockWalletServer::start(MockConfig::default()).unwrap();
    let ctx = context_for(&server);
    let (start, end) = january();

    let snapshot = ctx.load_dashboard(start, end).await;
    assert!(!snapshot.balance.is_available());
    assert_eq!(snapshot.history.unwrap_err().kind(), ErrorKind::NoSession);
    assert_eq!(server.request_count(), 0);
}

#[tokio::test]
async fn test_missing_credentials_fail_before_network() {
    let server = MockWalletServer::start(MockConfig::default()).unwrap();
    let ctx = WalletContext::new(Config::for_base_url(&server.base_url())).unwrap();

    let err = ctx.login("a@b.c").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
    assert_eq!(server.request_count(), 0);
}

#[tokio::test]
async fn test_logout_then_relogin() {
    let server = MockWalletServer::start(MockConfig::default()).unwrap();
    let ctx = context_for(&server);
    let (start, end) = january();

    let first = ctx.login("a@b.c").await.unwrap();
    ctx.history_service.search(start, end).await.unwrap();

    ctx.logout();
    assert!(!ctx.is_authenticated());
    assert!(ctx.history_service.view().records.is_empty());
    assert_eq!(
        ctx.balance_service.fetch_balance().await.unwrap_err().kind(),
        ErrorKind::NoSession
    );

    let second = ctx.relogin("a@b.c").await.unwrap();
    assert_ne!(first.session.token(), second.session.token());
    assert_eq!(ctx.session_store.get().unwrap().token(), second.session.token());
}

// ============================================================================
// Dashboard
// ============================================================================

#[tokio::test]
async fn test_dashboard_failures_are_independent() {
    let server = MockWalletServer::start(MockConfig {
        fail_balance: true,
        ..Default::default()
    })
    .unwrap();
    let ctx = context_for(&server);
    ctx.login("a@b.c").await.unwrap();
    let (start, end) = january();

    let snapshot = ctx.load_dashboard(start, end).await;
    assert_eq!(snapshot.balance.amount(), Decimal::ZERO);
    assert!(matches!(snapshot.balance, BalanceDisplay::Unavailable { .. }));
    assert_eq!(snapshot.history.unwrap().result_count(), 20);
}

#[tokio::test]
async fn test_dashboard_walks_to_the_end() {
    let server = MockWalletServer::start(MockConfig::default()).unwrap();
    let ctx = context_for(&server);
    ctx.login("a@b.c").await.unwrap();
    let (start, end) = january();

    let snapshot = ctx.load_dashboard(start, end).await;
    assert!(snapshot.balance.is_available());
    assert!(snapshot.history.unwrap().can_go_forward());

    ctx.history_service.next().await.unwrap();
    let view = ctx.history_service.next().await.unwrap();
    assert_eq!(view.result_count(), 5);
    assert!(view.last_page_reached);

    // Past the end the server answers with XML
    let view = ctx.history_service.next().await.unwrap();
    assert_eq!(view.page, 4);
    assert!(view.raw_xml.is_some());
    assert!(!view.can_go_forward());

    let refreshed = ctx.refresh_dashboard().await;
    assert_eq!(refreshed.history.unwrap().page, 4);
}

#[tokio::test]
async fn test_timeout_surfaces_as_retryable() {
    let server = MockWalletServer::start(MockConfig {
        delay_ms: 2500,
        ..Default::default()
    })
    .unwrap();
    let mut config = Config::for_base_url(&server.base_url())
        .with_credentials(&server.config().api_key, &server.config().api_secret);
    config.timeout_secs = 1;
    // Skip the lookup so the timeout comes from the login request
    config.public_ip = Some("192.0.2.1".to_string());
    let ctx = WalletContext::new(config).unwrap();

    let err = ctx.login("a@b.c").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(err.is_retryable());
    assert!(!ctx.is_authenticated());
}

#[tokio::test]
async fn test_ip_lookup_timeout_aborts_login_as_network() {
    let server = MockWalletServer::start(MockConfig {
        delay_ms: 2500,
        ..Default::default()
    })
    .unwrap();
    let mut config = Config::for_base_url(&server.base_url())
        .with_credentials(&server.config().api_key, &server.config().api_secret);
    config.timeout_secs = 1;
    let ctx = WalletContext::new(config).unwrap();

    let err = ctx.login("a@b.c").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(server.requests_to("/auth/login").is_empty());
    assert!(!ctx.is_authenticated());
}

#[tokio::test]
async fn test_custom_parts() {
    let server = MockWalletServer::start(MockConfig::default()).unwrap();
    let config = Config::for_base_url(&server.base_url())
        .with_credentials(&server.config().api_key, &server.config().api_secret);
    let ctx = WalletContext::with_parts(
        config,
        Arc::new(StaticIpResolver::new("192.0.2.44")),
        Arc::new(InMemorySessionStore::new()),
    )
    .unwrap();

    ctx.login("a@b.c").await.unwrap();
    assert!(server.requests_to("/ip").is_empty());
}

#[tokio::test]
async fn test_operation_result_envelope() {
    let server = MockWalletServer::start(MockConfig::default()).unwrap();
    let ctx = context_for(&server);

    let result: OperationResult<_> = ctx.balance_service.fetch_balance().await.into();
    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::NoSession));

    ctx.login("a@b.c").await.unwrap();
    let result: OperationResult<_> = ctx.balance_service.fetch_balance().await.into();
    assert!(result.success);
    assert!(result.data.is_some());
}

// ============================================================================
// Configuration
// ============================================================================

#[tokio::test]
async fn test_context_from_loaded_config() {
    let server = MockWalletServer::start(MockConfig::default()).unwrap();
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join("settings.json"),
        r#"{"batchSize": 10, "identity": {"defaultRole": "viewer"}}"#,
    )
    .unwrap();

    let base_url = server.base_url();
    let ip_url = server.ip_lookup_url();
    let key = server.config().api_key.clone();
    let secret = server.config().api_secret.clone();
    let config = Config::load_with_env(temp_dir.path(), |name| match name {
        n if n == BASE_URL_ENV => Some(base_url.clone()),
        n if n == IP_LOOKUP_URL_ENV => Some(ip_url.clone()),
        n if n == API_KEY_ENV => Some(key.clone()),
        n if n == API_SECRET_ENV => Some(secret.clone()),
        _ => None,
    })
    .unwrap();
    let ctx = WalletContext::new(config).unwrap();

    let outcome = ctx.login("a@b.c").await.unwrap();
    assert_eq!(outcome.user.role, "viewer");

    let (start, end) = january();
    let view = ctx.history_service.search(start, end).await.unwrap();
    assert_eq!(view.result_count(), 10);
    assert_eq!(server.requests_to("/history")[0].header("batchSize"), Some("10"));
}
