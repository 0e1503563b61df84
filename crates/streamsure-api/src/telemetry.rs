use tracing_subscriber::{
    fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default filter. Safe to call more than once; later
/// calls are ignored.
pub fn init_telemetry(environment: &str) {
    let console_fmt = tracing_subscriber::fmt::layer().event_format(
        Format::default()
            .compact()
            .with_target(false)
            .without_time(),
    );
    let installed = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "streamsure=debug,tower_http=debug".into()),
        )
        .with(console_fmt)
        .try_init();

    if installed.is_ok() {
        tracing::info!(environment = %environment, "Tracing initialized");
    }
}
