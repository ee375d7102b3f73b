use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

/// Sets up the global subscriber. `RUST_LOG` takes precedence over the
/// default level: `debug` when verbose, otherwise `default_level`.
pub fn init_logging(verbose: bool, default_level: LevelFilter) {
    let level_filter = if verbose {
        LevelFilter::DEBUG
    } else {
        default_level
    };
    let app_filter = Targets::new()
        .with_target("coinfx", level_filter)
        .with_default(LevelFilter::WARN);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_filter.to_string()));

    tracing_subscriber::registry()
        .with(fmt::layer().pretty().without_time())
        .with(app_filter)
        .with(env_filter)
        .init();
}
