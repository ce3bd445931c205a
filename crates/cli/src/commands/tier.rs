//! `murmur tier`: show the detected API tier.

use super::{CliResult, build_app, load_config, print_json};
use std::path::Path;

pub async fn run(config_path: &Path, refresh: bool) -> CliResult {
    let app = build_app(load_config(config_path)?, false).await?;
    if refresh {
        print_json(&app.service.refresh_tier().await)
    } else {
        print_json(&app.service.tier_status().await)
    }
}
