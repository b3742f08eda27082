use crate::Result;

/// Initialize tracing for a leadflow binary.
///
/// Default: info for our crates, warn for everything else. Can be overridden
/// with `RUST_LOG`.
pub fn init(service_name: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,leadflow=info,leadflow_core=info,leadflow_google=info,leadflow_apollo=info,leadflow_telegram=info,{}=info",
            service_name.replace('-', "_")
        ))
    });

    // A second init (tests, embedded use) keeps the first subscriber.
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .try_init();

    Ok(())
}
