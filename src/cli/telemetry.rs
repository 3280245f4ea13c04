use anyhow::Result;
use std::env::var;
use tracing::Level;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

/// Initialize logging for the service.
///
/// Output is human-readable by default; set `FINSIGHT_AUTH_LOG_JSON` to emit
/// one JSON object per line for log shippers.
///
/// # Errors
///
/// Returns an error if subscriber initialization fails or a filter directive
/// cannot be parsed.
pub fn init(verbosity_level: Option<Level>) -> Result<()> {
    let verbosity_level = verbosity_level.unwrap_or(Level::ERROR);

    let filter = EnvFilter::builder()
        .with_default_directive(verbosity_level.into())
        .from_env_lossy()
        .add_directive("hyper=error".parse()?)
        .add_directive("tokio=error".parse()?);

    if var("FINSIGHT_AUTH_LOG_JSON").is_ok() {
        let fmt_layer = fmt::layer()
            .with_file(false)
            .with_line_number(false)
            .with_target(false)
            .json();
        let subscriber = Registry::default().with(fmt_layer).with(filter);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let fmt_layer = fmt::layer()
            .with_file(false)
            .with_line_number(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_target(false)
            .pretty();
        let subscriber = Registry::default().with(fmt_layer).with(filter);
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}
