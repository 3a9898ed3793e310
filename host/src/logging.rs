//! Logging-Setup via tracing-subscriber
//!
//! Umgebungsvariablen haben Vorrang vor der Konfigurationsdatei:
//! - `FUNK_LOG_LEVEL`: Filter (z.B. `debug` oder `funkspruch_voice=trace`)
//! - `FUNK_LOG_FORMAT`: `text` oder `json`

use tracing_subscriber::{fmt, EnvFilter};

/// Initialisiert das Logging-System
pub fn logging_initialisieren(level: &str, format: &str) {
    let filter = EnvFilter::try_from_env("FUNK_LOG_LEVEL")
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = std::env::var("FUNK_LOG_FORMAT").unwrap_or_else(|_| format.to_string());

    match format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt().with_env_filter(filter).with_target(true).init();
        }
    }
}
