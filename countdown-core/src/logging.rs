use tracing_subscriber::{fmt, EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use tracing_appender::{rolling, non_blocking::WorkerGuard};
use once_cell::sync::OnceCell;
use std::fs;
use std::path::Path;

static INIT: OnceCell<()> = OnceCell::new();
static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Console plus daily-rolling file logging under `dir`. Later calls are no-ops.
pub fn init_logging(dir: impl AsRef<Path>) {
    let dir = dir.as_ref();
    let _ = INIT.get_or_init(|| {
        let _ = fs::create_dir_all(dir);
        let file_appender = rolling::daily(dir, "countdown.log");
        let (nb_file, guard) = tracing_appender::non_blocking(file_appender);
        let _ = FILE_GUARD.set(guard); // flushes on drop, so it lives as long as the process

        let console_layer = fmt::layer().with_target(false);
        let file_layer = fmt::layer().with_writer(nb_file).with_target(false).with_ansi(false);

        let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::registry()
            .with(env)
            .with(console_layer)
            .with(file_layer)
            .try_init();
    });
}
