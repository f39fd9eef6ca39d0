use ical_notifier::startup;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> miette::Result<()> {
    // Initialize logging
    startup::init_logging()?;

    info!("Starting ical-notifier");

    // Load configuration, a missing webhook or feed list stops here
    let config = startup::load_config()?;

    // Start the notifier
    startup::start_notifier(config).await
}
