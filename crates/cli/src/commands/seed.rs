//! `wealthdesk seed` - Seed the demo dataset.

use wealthdesk_config::AppConfig;
use wealthdesk_store::SqliteStore;

pub async fn run() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let store = SqliteStore::new(&config.store.path).await?;

    let created = wealthdesk_store::seed::seed(&store).await?;
    if created == 0 {
        println!("Store already has clients; nothing to seed.");
    } else {
        println!("Seeded {created} demo clients into {}", config.store.path);
    }
    Ok(())
}
