mod config;
mod dispatcher;
mod error;
mod health;
mod lifecycle;
mod platform;
mod replies;
mod resolver;
mod responder;
mod scope;
mod worker;

#[cfg(test)]
mod test_support;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::lifecycle::Lifecycle;
use crate::platform::max::MaxClient;
use crate::platform::{update_stream, Platform};
use crate::resolver::Resolver;
use crate::worker::Worker;

/// Upper bound on the startup identity round trip.
const IDENTITY_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,benefitbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  API: {}", config.max.api_url);
    info!("  Responder: {}", config.responder.kind);
    info!("  Worker deadline: {:?}", config.worker.deadline());
    info!("  Max in flight: {}", config.worker.max_in_flight);

    let lifecycle = Lifecycle::new();
    lifecycle.watch_signals();
    let root = lifecycle.root_scope();

    if config.health.enabled {
        tokio::spawn(health::run(config.health.port, root.clone()));
    }

    let platform: Arc<dyn Platform> =
        Arc::new(MaxClient::connect(&config.max).context("Failed to create MAX client")?);

    match platform.fetch_identity(&root.child(IDENTITY_TIMEOUT)).await {
        Ok(identity) => info!(
            "Bot {} (id {}, @{}) is ready",
            identity.name,
            identity.user_id,
            identity.username.as_deref().unwrap_or("-")
        ),
        Err(e) if e.is_auth() => {
            return Err(e).context("MAX rejected the bot token");
        }
        Err(e) => warn!("Failed to fetch bot info: {}", e),
    }

    let responder = responder::from_config(&config.responder)?;
    let resolver = Arc::new(Resolver::new(responder));
    let worker = Arc::new(Worker::new(
        platform.clone(),
        resolver,
        config.worker.deadline(),
    ));
    let dispatcher = Dispatcher::new(worker, config.worker.max_in_flight);

    info!("Bot is starting...");
    let (updates, end) = update_stream(platform, root.clone());
    dispatcher.run(&root, updates).await;

    lifecycle.shutdown();
    if let Some(e) = end.reason() {
        return Err(e.clone()).context("MAX rejected the bot token");
    }
    info!("Bot stopped");
    Ok(())
}
