use std::io::Write;

use chrono::Local;
use log::LevelFilter;

/// Installs a timestamped stderr logger. `RUST_LOG` overrides `level`.
/// Does nothing if a logger is already installed, e.g. by an embedding app.
pub fn init(level: LevelFilter) {
    let result = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}: {}",
                Local::now().to_rfc3339(),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init();

    match result {
        Ok(()) => log::info!("Logging initialized"),
        Err(_) => log::debug!("Logger already installed, keeping it"),
    }
}
