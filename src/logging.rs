use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Initialise logging. `debug` enables debug-level output and lets
/// `RUST_LOG` override the level; otherwise the level is pinned to `info`.
/// With `log_file` set, output goes to that file instead of stderr.
pub fn init(debug: bool, log_file: Option<&Path>) {
    // Without debug logging `RUST_LOG` is ignored so a stray value in the
    // environment cannot turn on verbose per-resize output.
    let level = if debug { "debug" } else { "info" };

    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let file_target = log_file.and_then(|path| {
        let name = path.file_name()?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Some((dir.to_path_buf(), name.to_owned()))
    });

    match file_target {
        Some((dir, name)) => {
            let appender = tracing_appender::rolling::never(dir, name);
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(appender)
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .try_init();
        }
    }
}
