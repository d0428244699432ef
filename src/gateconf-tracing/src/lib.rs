use anyhow::Result;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::{prelude::*, Registry};

/// Initialize the global tracing subscriber.
///
/// `logging_mode` is either an output style ("json", "pretty") or a filter
/// directive ("debug", "info", ...); unknown values fall back to plain
/// output at info level.
pub fn init(logging_mode: &str) -> Result<()> {
    // Style names are not filter directives; they log at info.
    let directive = match logging_mode {
        "json" | "pretty" => "info",
        other => other,
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer: Box<dyn tracing_subscriber::Layer<Registry> + Send + Sync> = match logging_mode {
        "json" => Box::new(
            fmt::layer()
                .json()
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_filter(filter),
        ),
        "pretty" => Box::new(fmt::layer().pretty().with_filter(filter)),
        _ => Box::new(fmt::layer().with_filter(filter)),
    };

    let subscriber = Registry::default().with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}
