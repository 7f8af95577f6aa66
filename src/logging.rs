use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `sheetwise=debug`.
pub const LOG_ENV: &str = "SHEETWISE_LOG";

/// Install a fmt subscriber filtered by [`LOG_ENV`] (default `info`).
///
/// Calling this more than once is harmless; later calls leave the first
/// subscriber in place.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init();
        init();
        tracing::info!("logging initialized twice");
    }
}
