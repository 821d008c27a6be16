//! Tracing subscriber setup for the `stockfetch` command line
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

/// Level for this crate's own events given the `--verbose` flag.
pub fn crate_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::OFF
    }
}

/// Installs the global subscriber on stderr, leaving stdout to tables and
/// progress output. Silent unless `verbose` or `RUST_LOG` is set; HTTP
/// client internals only show up through `RUST_LOG`.
pub fn init_logging(verbose: bool) {
    let level = crate_level(verbose);
    let app_filter = Targets::new().with_target(env!("CARGO_CRATE_NAME"), level);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    tracing_subscriber::registry()
        .with(fmt::layer().pretty().without_time().with_writer(std::io::stderr))
        .with(app_filter)
        .with(env_filter)
        .init();
}
