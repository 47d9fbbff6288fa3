//! Tracing setup with a level that configuration replaces after startup.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

/// Level used until the configuration file has been read.
const STARTUP_LEVEL: &str = "info";

/// sqlx logs statement text at debug, and role statements carry password
/// literals.
const STATEMENT_LOG_DIRECTIVE: &str = "sqlx=warn";

static LOG_RELOAD_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// Filter for a configured level with statement logging held at warn.
pub fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("{level},{STATEMENT_LOG_DIRECTIVE}"))
}

/// Installs the global subscriber. `RUST_LOG` is used verbatim when set.
///
/// Calling this more than once leaves the first subscriber in place.
pub fn init_tracing() {
    let filter = std::env::var_os("RUST_LOG")
        .and_then(|_| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| level_filter(STARTUP_LEVEL));

    let (reload_layer, handle) = reload::Layer::new(filter);
    if LOG_RELOAD_HANDLE.set(handle).is_err() {
        return;
    }

    let _ = tracing_subscriber::registry()
        .with(reload_layer)
        .with(fmt::layer())
        .try_init();
}

/// Swaps in the configured level. Returns `false` when `RUST_LOG` is set
/// or tracing was never initialized.
pub fn apply_logging_level(level: &str) -> bool {
    if std::env::var_os("RUST_LOG").is_some() {
        return false;
    }
    let Some(handle) = LOG_RELOAD_HANDLE.get() else {
        return false;
    };
    handle.modify(|filter| *filter = level_filter(level)).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter_pins_statement_logging() {
        let filter = level_filter("debug").to_string();
        assert!(filter.contains("debug"));
        assert!(filter.contains(STATEMENT_LOG_DIRECTIVE));
    }

    #[test]
    fn test_level_applies_after_init() {
        init_tracing();
        init_tracing();
        let applied = apply_logging_level("debug");
        assert_eq!(applied, std::env::var_os("RUST_LOG").is_none());
    }
}
