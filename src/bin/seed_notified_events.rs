use ical_notifier::error::NotifierResult;
use ical_notifier::startup;

/// Mark every event currently listed in the feeds as already announced,
/// so the first real run does not flood the channel.
#[tokio::main(flavor = "current_thread")]
async fn main() -> miette::Result<()> {
    startup::init_logging()?;

    let config = startup::load_config()?;
    let added = seed(startup::build_cycle(&config)?).await?;

    println!(
        "Recorded {} new event(s) in {}",
        added,
        config.state_file.display()
    );
    Ok(())
}

async fn seed(cycle: startup::LiveCycle) -> NotifierResult<usize> {
    let mut known = cycle.store().try_load().await?;
    cycle.seed(&mut known).await
}
