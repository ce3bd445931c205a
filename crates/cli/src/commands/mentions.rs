//! `murmur mentions`: list new mentions, or process them.

use super::{CliResult, build_app, load_config, print_json};
use std::path::Path;

pub async fn run(config_path: &Path, process: bool) -> CliResult {
    let app = build_app(load_config(config_path)?, false).await?;
    let summary = app.service.check_mentions(!process).await;
    print_json(&summary)
}
