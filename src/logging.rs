//! Tracing setup shared by every subcommand

use std::sync::Once;

use tracing_subscriber::{fmt, EnvFilter};

static TRACING_INIT: Once = Once::new();

/// Default directive for the given `-v` count
fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "expensetrack=warn",
        1 => "expensetrack=info",
        _ => "expensetrack=debug",
    }
}

/// Initialize the global subscriber once. Logs go to stderr so JSON on
/// stdout stays machine-readable; `RUST_LOG` takes precedence.
pub fn init_tracing(verbosity: u8) {
    TRACING_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    });
}
