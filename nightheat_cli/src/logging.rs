//! Tracing subscriber setup: console layer plus an optional JSON file sink.

use std::path::Path;

use nightheat_config::Logging;
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::FILE_GUARD;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber.
///
/// Console output goes to stderr so stdout stays clean for results. `RUST_LOG`
/// wins over `--log-level`. The file sink, when configured, always writes JSON.
pub fn init_logging(json: bool, level: &str, cfg: &Logging) -> eyre::Result<()> {
    let console_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let console: BoxedLayer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    };

    let mut layers = vec![console];
    if let Some(file) = cfg.file.as_deref() {
        layers.push(file_layer(Path::new(file), cfg)?);
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| eyre::eyre!("logging already initialised: {e}"))
}

fn file_layer(path: &Path, cfg: &Logging) -> eyre::Result<BoxedLayer> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .ok_or_else(|| eyre::eyre!("logging.file has no file name: {}", path.display()))?;
    std::fs::create_dir_all(dir)?;

    let appender = match cfg.rotation.as_deref().unwrap_or("never") {
        "daily" => tracing_appender::rolling::daily(dir, name),
        "hourly" => tracing_appender::rolling::hourly(dir, name),
        _ => tracing_appender::rolling::never(dir, name),
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);
    // Only the first guard is kept; logging is initialised once per process.
    let _ = FILE_GUARD.set(guard);

    let filter = EnvFilter::try_new(cfg.level.as_deref().unwrap_or("info"))?;
    Ok(tracing_subscriber::fmt::layer()
        .json()
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(filter)
        .boxed())
}
