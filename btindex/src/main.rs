use std::io;

use btindex::cli::Shell;
use btindex::config::IndexConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "btindex=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    // Load configuration from environment variables
    let config = match IndexConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing::debug!(
        cache_capacity = config.cache_capacity,
        sync_writes = config.sync_writes,
        "loaded configuration"
    );

    let mut shell = Shell::new(io::stdin().lock(), io::stdout(), config);
    if let Err(e) = shell.run() {
        tracing::error!("Terminal I/O failed: {e}");
        std::process::exit(1);
    }
}
