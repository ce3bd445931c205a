//! `murmur init`: write a default configuration file.

use super::CliResult;
use murmur_config::AppConfig;
use std::path::Path;

pub fn run(config_path: &Path) -> CliResult {
    if config_path.exists() {
        println!("Config already exists at: {}", config_path.display());
        println!("Edit it manually or delete it and re-run init.");
        return Ok(());
    }
    if let Some(dir) = config_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(config_path, AppConfig::default_toml())?;

    println!("Created {}", config_path.display());
    println!("\nNext steps:");
    println!("  1. Set OPENROUTER_API_KEY and the TWITTER_* credentials (or edit the file)");
    println!("  2. Try a cycle without publishing: murmur run --dry-run");
    println!("  3. Start the service: murmur serve");
    Ok(())
}
