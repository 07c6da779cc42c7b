use color_eyre::eyre::{
    Result,
    eyre,
};
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Routes tracing output to `log_file`.
///
/// The terminal belongs to the UI, so nothing is ever written to stdout. The
/// returned guard flushes the writer on drop and must outlive the app.
pub fn init_tracing(log_file: &Path) -> Result<WorkerGuard> {
    let parent = log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_file
        .file_name()
        .ok_or_else(|| eyre!("log file path has no file name: {}", log_file.display()))?;

    let appender = tracing_appender::rolling::never(parent, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .map_err(|e| eyre!("failed to install tracing subscriber: {e}"))?;

    Ok(guard)
}
