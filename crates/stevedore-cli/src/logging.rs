use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the stderr log subscriber
///
/// `RUST_LOG` wins when set. Otherwise only warnings are shown, or
/// everything from stevedore at debug level with `--debug`.
pub fn init(debug: bool) {
    let default = if debug {
        "warn,stevedore=debug,stevedore_core=debug,stevedore_repo=debug,stevedore_deploy=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(debug)
        .compact();

    // Already installed when embedded in a test harness
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
