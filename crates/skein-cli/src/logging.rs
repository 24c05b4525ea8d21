use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

/// RUST_LOG が無ければ info
pub fn init_logging() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let formatting_layer = fmt::layer().with_target(true).compact();

    let subscriber = Registry::default().with(filter).with(formatting_layer);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
