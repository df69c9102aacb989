//! Logging setup
//!
//! Diagnostics go to stderr so stdout stays clean for `--json` output.
//! Session tokens and credentials are never logged; use
//! [`Session::fingerprint`](crate::domain::Session::fingerprint) instead.

use std::sync::Once;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Default filter for a verbosity count (`-v`, `-vv`, ...)
pub fn filter_directive(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    format!("wallet_core={level},wallet_cli={level}")
}

/// Initialize the global subscriber once. `RUST_LOG` overrides `verbosity`.
pub fn init(verbosity: u8) {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbosity)));

        // Another subscriber may already be installed (tests, embedding apps)
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .compact(),
            )
            .try_init();
    });
}
