// Path: crates/telemetry/src/init.rs
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Directives used when `RUST_LOG` is unset: info for the provenet
/// services, warn for the HTTP/RPC stacks underneath them.
const DEFAULT_FILTER: &str = "info,hyper=warn,h2=warn,tower=warn";

/// Initializes the global `tracing` subscriber for structured JSON logging.
///
/// `app` names the binary (hub or node) and is stamped on a startup event
/// so aggregated logs from both services stay distinguishable.
pub fn init_tracing(app: &str) -> Result<(), anyhow::Error> {
    let fmt_layer = fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339());
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let subscriber = Registry::default().with(filter).with(fmt_layer);
    tracing_log::LogTracer::init()?;
    tracing::subscriber::set_global_default(subscriber)?;
    tracing::info!(target: "telemetry", app, "tracing initialized");
    Ok(())
}
