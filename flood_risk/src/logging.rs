/// Console logging for the trainer and predictor binaries.
///
/// Wraps `env_logger` with the service's line format:
/// `2026-05-01 12:00:00 UTC INFO flood_risk::trainer: message`.
/// The default filter is `info`; `RUST_LOG` overrides it.

use chrono::Utc;
use std::io::Write;

/// Installs the console logger. Safe to call more than once: when a logger
/// is already installed (a second call, or a test harness logger) that one
/// stays in place.
pub fn init_logging() {
    if let Err(e) = builder().try_init() {
        log::debug!("Console logger not installed: {}", e);
    }
}

fn builder() -> env_logger::Builder {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} {:<5} {}: {}",
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
            record.level(),
            record.target(),
            record.args()
        )
    });
    builder
}
