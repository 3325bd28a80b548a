use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

/// `<cache_dir>/hbuild/hbctl.log`
pub fn log_file_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join("hbuild").join("hbctl.log"))
}

/// Install the global subscriber. `RUST_LOG` wins over `-v`.
///
/// Full-screen mode logs to a file so output does not tear the terminal.
pub fn init(verbose: bool, full_screen: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    if full_screen {
        let file = log_file_path().and_then(|path| {
            std::fs::create_dir_all(path.parent()?).ok()?;
            OpenOptions::new().create(true).append(true).open(path).ok()
        });
        match file {
            Some(file) => {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .try_init();
            }
            None => {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(std::io::sink)
                    .try_init();
            }
        }
        return;
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
