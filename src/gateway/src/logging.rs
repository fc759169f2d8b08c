use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "order_gateway=info,amqp=info";

/// Installs the global `fmt` subscriber, filtered by `RUST_LOG` when set.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
