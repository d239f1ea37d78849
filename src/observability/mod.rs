use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `log_level` comes from `features.log_level` in the YAML config. `DISABLED`
/// installs no subscriber at all; `WARNING` and `CRITICAL` are accepted as
/// aliases for WARN and ERROR. A level EnvFilter cannot parse falls back to
/// INFO.
pub fn init_tracing(log_level: &str) {
    let level = log_level.trim().to_uppercase();
    if level == "DISABLED" {
        return;
    }

    let directive = match level.as_str() {
        "WARNING" => "WARN",
        "CRITICAL" => "ERROR",
        other => other,
    };
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("INFO"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
