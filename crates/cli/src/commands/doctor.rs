//! `wealthdesk doctor` - Diagnose configuration and store health.

use wealthdesk_config::AppConfig;
use wealthdesk_store::SqliteStore;

pub async fn run() -> anyhow::Result<()> {
    println!("WealthDesk Doctor — System Diagnostics");
    println!("======================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    let config = if config_path.exists() {
        match AppConfig::load() {
            Ok(config) => {
                println!("  ok   Config file valid");
                Some(config)
            }
            Err(e) => {
                println!("  FAIL Config file invalid: {e}");
                issues += 1;
                None
            }
        }
    } else {
        println!("  --   No config file at {}; using defaults", config_path.display());
        let mut config = AppConfig::default();
        config.apply_env();
        Some(config)
    };

    if let Some(config) = config {
        if config.has_api_key() {
            println!("  ok   Reasoning API key configured");
        } else {
            println!("  warn No API key — set WEALTHDESK_API_KEY or ANTHROPIC_API_KEY");
            issues += 1;
        }

        match SqliteStore::new(&config.store.path).await {
            Ok(store) => {
                println!("  ok   Record store reachable at {}", config.store.path);
                match store.list_clients().await {
                    Ok(clients) if clients.is_empty() => {
                        println!("  warn Store has no clients — run `wealthdesk seed`");
                        issues += 1;
                    }
                    Ok(clients) => println!("  ok   {} client(s) on file", clients.len()),
                    Err(e) => {
                        println!("  FAIL Client query failed: {e}");
                        issues += 1;
                    }
                }
            }
            Err(e) => {
                println!("  FAIL Record store unavailable: {e}");
                issues += 1;
            }
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed.");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
