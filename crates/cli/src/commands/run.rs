//! `murmur run`: one cycle, summary on stdout.

use super::{CliResult, build_app, load_config, print_json};
use murmur_agent::CycleMode;
use std::path::Path;

pub async fn run(config_path: &Path, mode: Option<CycleMode>, dry_run: bool) -> CliResult {
    let config = load_config(config_path)?;
    let mode = mode.unwrap_or(if config.schedule.use_unified_agent {
        CycleMode::Continuous
    } else {
        CycleMode::Batch
    });
    let app = build_app(config, dry_run).await?;

    let summary = app.service.run_cycle(mode).await;
    print_json(&summary)?;
    if !summary.success() {
        std::process::exit(1);
    }
    Ok(())
}
