use crate::components::calendar::{EventFilter, IcalFeedClient};
use crate::components::discord_webhook::{DiscordWebhook, MessageFormatter};
use crate::components::event_store::EventStore;
use crate::components::scheduler::{run_scheduler_loop, NotificationCycle};
use crate::config::Config;
use crate::error::{Error, NotifierResult};
use crate::shutdown;
use reqwest::Client;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Notification pass wired to the real feeds and webhook
pub type LiveCycle = NotificationCycle<IcalFeedClient, DiscordWebhook>;

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn,hyper=warn")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load the application config, logging why it failed
pub fn load_config() -> miette::Result<Config> {
    match Config::load() {
        Ok(config) => Ok(config),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Shared HTTP client for feeds and webhook
pub fn http_client(config: &Config) -> NotifierResult<Client> {
    let client = Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(config.http_timeout))
        .build()?;
    Ok(client)
}

/// Wire the fetcher, notifier, store and filter described by `config`
pub fn build_cycle(config: &Config) -> NotifierResult<LiveCycle> {
    let client = http_client(config)?;

    let source = IcalFeedClient::new(client.clone(), config.timezone);
    let formatter = MessageFormatter::new(config.timezone, config.locale.clone(), config.roles.clone());
    let notifier = DiscordWebhook::new(client, config.webhook_url.clone(), formatter);
    let store = EventStore::new(config.state_file.clone());
    let filter = EventFilter::new(config.summary_filter.as_deref(), config.notify_past_events);

    Ok(NotificationCycle::new(
        config.feeds.clone(),
        source,
        notifier,
        store,
        filter,
    ))
}

/// Run the notifier until a termination signal arrives
pub async fn start_notifier(config: Config) -> miette::Result<()> {
    let cycle = build_cycle(&config)?;

    let known = cycle.store().load().await;
    info!(
        "Loaded {} notified event(s) from {}",
        known.len(),
        cycle.store().path().display()
    );

    // Create shutdown channel
    let (shutdown_send, shutdown_recv) = oneshot::channel();

    // Spawn signal handler task
    tokio::spawn(shutdown::handle_signals(shutdown_send));

    let interval = Duration::from_secs(config.check_interval);
    let known = run_scheduler_loop(&cycle, known, interval, shutdown_recv).await;

    info!("Stopped with {} notified event(s) recorded", known.len());
    Ok(())
}
