/// Log setup. The terminal belongs to the renderer, so logs go to a file.
///
/// Filter: `JUMPIT_LOG` (EnvFilter syntax), default `info`.
/// File:   `JUMPIT_LOG_FILE`, default `jumpit.log` in the CWD.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

const FILTER_ENV: &str = "JUMPIT_LOG";
const FILE_ENV: &str = "JUMPIT_LOG_FILE";
const DEFAULT_FILE: &str = "jumpit.log";

pub fn init() {
    let filter = EnvFilter::try_from_env(FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let path = std::env::var(FILE_ENV).unwrap_or_else(|_| DEFAULT_FILE.to_string());
    let file = OpenOptions::new().create(true).append(true).open(&path);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .compact();

    // Without a writable log file, logging is dropped rather than
    // scribbling over the game screen.
    let _ = match file {
        Ok(f) => builder.with_writer(Mutex::new(f)).try_init(),
        Err(_) => builder.with_writer(std::io::sink).try_init(),
    };

    install_panic_hook();
}

/// Log panics, then hand them to the previously installed hook so the
/// message still reaches stderr.
fn install_panic_hook() {
    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
        prev(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn panic_hook_chains_to_previous_hook() {
        static PREV_CALLED: AtomicBool = AtomicBool::new(false);

        let saved = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| PREV_CALLED.store(true, Ordering::SeqCst)));
        install_panic_hook();

        let result = std::panic::catch_unwind(|| panic!("boom"));

        let _ = std::panic::take_hook();
        std::panic::set_hook(saved);

        assert!(result.is_err());
        assert!(PREV_CALLED.load(Ordering::SeqCst));
    }
}
