use std::time::Duration;

pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// Install the stderr logger. `RUST_LOG` still overrides `level`.
pub fn init_logging(level: log::Level) {
    let _ = env_logger::Builder::new()
        .filter_level(level.to_level_filter())
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();
}

pub fn install_panic_hook() {}
