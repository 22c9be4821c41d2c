pub mod api; // Fetch proxy for listing imports
pub mod config;
pub mod dashboard;
pub mod models;
pub mod pipeline; // Model fallback, extraction, concierge chat, transcription
pub mod realtime;
pub mod reconcile;
pub mod store;
pub mod visibility;
pub mod workspace;

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` wins over the default filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}
