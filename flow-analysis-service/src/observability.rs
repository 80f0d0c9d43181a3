use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber. `RUST_LOG` directives are honoured on top of
/// the crate's default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("flow_analysis_service=info".parse().unwrap_or_else(|_| "info".parse().unwrap()))
        .add_directive("flow_report=info".parse().unwrap_or_else(|_| "info".parse().unwrap()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
