use {
    std::{io::IsTerminal, panic::PanicHookInfo, sync::Once},
    time::macros::format_description,
    tracing::level_filters::LevelFilter,
    tracing_subscriber::{
        EnvFilter,
        fmt::{time::UtcTime, writer::MakeWriterExt as _},
    },
};

/// Initializes the global tracing subscriber and installs a panic hook that
/// reports through it.
///
/// `env_filter` uses the [`EnvFilter`] directive syntax, e.g.
/// `warn,deployer=info`. Events at or above `stderr_threshold` are written to
/// stderr, everything else goes to stdout.
pub fn initialize(env_filter: &str, stderr_threshold: LevelFilter) {
    set_tracing_subscriber(env_filter, stderr_threshold);
    std::panic::set_hook(Box::new(tracing_panic_hook));
}

/// Like [`initialize`], but can be called multiple times in a row. Later calls
/// are ignored.
///
/// Useful for tests.
pub fn initialize_reentrant(env_filter: &str) {
    // The subscriber is a process wide global, a second `init` would panic.
    static ONCE: Once = Once::new();
    ONCE.call_once(|| set_tracing_subscriber(env_filter, LevelFilter::ERROR));
}

fn set_tracing_subscriber(env_filter: &str, stderr_threshold: LevelFilter) {
    let builder = tracing_subscriber::fmt::fmt()
        .with_timer(UtcTime::new(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
        )))
        .with_env_filter(EnvFilter::new(env_filter))
        .with_ansi(std::io::stdout().is_terminal());

    match stderr_threshold.into_level() {
        Some(threshold) => builder
            .with_writer(
                std::io::stderr
                    .with_max_level(threshold)
                    .or_else(std::io::stdout),
            )
            .init(),
        None => builder.init(),
    }
}

/// Panic hook that prints roughly the same message as the default panic hook
/// but uses `tracing::error!` instead of stderr.
fn tracing_panic_hook(panic: &PanicHookInfo) {
    let thread = std::thread::current();
    let name = thread.name().unwrap_or("<unnamed>");
    let backtrace = std::backtrace::Backtrace::force_capture();
    tracing::error!("thread '{name}' {panic}\nstack backtrace:\n{backtrace}");
}
