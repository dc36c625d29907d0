//! `wealthdesk serve` - Start the gateway server.

use wealthdesk_config::AppConfig;

pub async fn run(port: Option<u16>, seed: bool) -> anyhow::Result<()> {
    let mut config = AppConfig::load()?;
    if let Some(port) = port {
        config.gateway.port = port;
    }
    if seed {
        config.store.seed_on_start = true;
    }

    wealthdesk_gateway::start(config).await?;
    Ok(())
}
