use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info};
use std::sync::Arc;

use eventkeeper::core::{Clock, Config, SystemClock};
use eventkeeper::features::{
    apply_seed, get_version, AccountService, EventService, LogNotificationSink, ReminderScheduler,
    SeedData,
};
use eventkeeper::store::{EntityStore, MemoryStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting event tracker v{}...", get_version());

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::new(clock.clone()));
    let accounts = AccountService::new(store.clone());
    let events = Arc::new(EventService::new(store.clone(), clock.clone()));

    // Optional seed file for a freshly started store
    if let Some(seed_path) = &config.seed_file {
        match SeedData::load(seed_path).and_then(|seed| apply_seed(&accounts, &events, seed)) {
            Ok(summary) => info!(
                "📄 Loaded seed data from {}: {summary:?}",
                seed_path.display()
            ),
            Err(e) => {
                error!(
                    "❌ Failed to load seed data from {}: {e:#}",
                    seed_path.display()
                );
                return Err(e);
            }
        }
    }

    let scheduler = Arc::new(ReminderScheduler::new(
        events,
        Arc::new(LogNotificationSink),
        clock,
        config.reminders,
    ));
    let handle = scheduler.start()?;

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested, stopping reminder scheduler...");
    handle.shutdown().await;

    Ok(())
}
