//! Logging setup shared by the binaries

use std::io::Write;

/// Initialise `env_logger` at `info` unless `RUST_LOG` says otherwise.
///
/// Lines read `MM/DD/YYYY HH:MM:SS AM - LEVEL - message`.
pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%m/%d/%Y %I:%M:%S %p"),
                record.level(),
                record.args()
            )
        })
        .try_init();
}
