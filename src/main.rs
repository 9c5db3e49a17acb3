//! Advisor Chat Server
//!
//! Entry point for the advisor chat widget.

use std::sync::Arc;

use mimalloc::MiMalloc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use advisor_chat::config::AppConfig;
use advisor_chat::server::start_server;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenvy::dotenv();

    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing (M-LOG-STRUCTURED)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.json {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }

    start_server(Arc::new(config)).await
}
