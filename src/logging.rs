//! Opt-in log output for binaries and tests.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Installs a `fmt` subscriber writing to stderr. Only the first call has an
/// effect; later calls and an already installed global subscriber are ignored.
///
/// `filter` takes `RUST_LOG` syntax. Without one, `RUST_LOG` is read, and
/// `info` is used when that is unset or invalid.
///
/// # Example
///
/// ```
/// qirust_styling::logging::init_logging(Some("qirust_styling=debug"));
/// ```
pub fn init_logging(filter: Option<&str>) {
    INIT.call_once(|| {
        let filter = match filter {
            Some(directives) => EnvFilter::try_new(directives).ok(),
            None => EnvFilter::try_from_default_env().ok(),
        }
        .unwrap_or_else(|| EnvFilter::new("info"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
