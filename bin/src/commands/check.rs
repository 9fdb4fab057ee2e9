//! Check command implementation.

use anyhow::{Context, Result};
use std::path::Path;
use tickscan_daemon::ScannerConfig;

/// Validate a configuration file and print what the scanner would do.
pub(crate) fn check(config_path: &Path) -> Result<()> {
    let mut config = ScannerConfig::load(config_path)
        .with_context(|| format!("Failed to load config: {}", config_path.display()))?;
    config.apply_floors();
    config
        .validate()
        .with_context(|| format!("Invalid config: {}", config_path.display()))?;

    let intervals = config
        .parsed_intervals()?
        .iter()
        .map(|i| i.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    println!("Config:      {}", config_path.display());
    println!("Exchange:    {}", config.exchange_id()?);
    println!("Instance:    {}", config.instance);
    println!("Refresh:     {}s", config.refresh_seconds);
    if config.symbols.is_empty() {
        println!("Symbols:     discovered from first snapshot");
    } else {
        println!("Symbols:     {}", config.symbols.len());
    }
    println!("Blacklisted: {}", config.blacklisted_symbols.len());
    println!("Batch size:  {}", config.batch_size);
    println!("Intervals:   {intervals}");
    println!("Database:    {}", config.database.provider);
    if config.streaming.enabled {
        println!("Streaming:   {}", config.streaming.provider);
    } else {
        println!("Streaming:   disabled");
    }

    println!("\nConfiguration OK");
    Ok(())
}
