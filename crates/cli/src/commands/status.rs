//! `murmur status`: show the resolved configuration.

use super::{CliResult, load_config};
use std::path::Path;

pub fn run(config_path: &Path) -> CliResult {
    let config = load_config(config_path)?;
    let yes_no = |b: bool| if b { "yes" } else { "no" };
    let mode = if config.schedule.use_unified_agent {
        format!("continuous, every {} min", config.schedule.agent_interval_minutes)
    } else {
        format!(
            "batch every {} min, mentions every {} min",
            config.schedule.post_interval_minutes, config.schedule.mentions_interval_minutes
        )
    };

    println!("murmur status");
    println!("=============");
    println!("  Config file:   {}{}", config_path.display(), if config_path.exists() { "" } else { " (missing, defaults)" });
    println!("  Database:      {}", config.database.path);
    println!("  Model:         {}", config.openrouter.model);
    println!("  Schedule:      {mode}");
    println!("  Images:        {}", yes_no(config.features.enable_image_generation));
    println!("  Mentions:      {}", yes_no(config.features.allow_mentions));
    println!("  Gateway:       {}:{}", config.gateway.host, config.gateway.port);
    println!("  Model key:     {}", yes_no(config.has_api_key()));
    println!("  Twitter creds: {}", yes_no(config.twitter.has_user_credentials()));
    println!("\n{config:#?}");
    Ok(())
}
