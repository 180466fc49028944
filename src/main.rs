//! OrderWatch - order status notifier
//!
//! Publishes a sequence of order status changes to a set of notifiers and
//! shuts them down gracefully.

use anyhow::Result;
use clap::Parser;
use orderwatch::{app, cli::Cli, config::Config};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = Config::load(&cli).unwrap_or_else(|err| {
        // Manually initialize logging for this specific error
        tracing_subscriber::fmt().init();
        error!("Failed to load configuration: {}", err);
        std::process::exit(1);
    });

    // RUST_LOG takes precedence over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!("OrderWatch starting up...");

    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Variant: {:?}", config.variant);
    info!("Order ID: {}", config.order_id);
    info!("Statuses: {}", config.statuses.join(" -> "));
    info!("Pause Between Updates: {}ms", config.pause_ms);
    info!("Delivery Mode: {:?}", config.delivery.delivery_mode()?);
    info!("Output Format: {}", config.output.format);
    info!("-------------------------------------------------------");

    app::run(&config).await?;

    info!("All subscribers shut down. Exiting.");
    Ok(())
}
