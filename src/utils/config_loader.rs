use std::path::Path;

use anyhow::{anyhow, Result};
use tracing::info;

use crate::config::proc_loader::{file_to_config, parse_config};
use crate::config::settings::DemoConfig;
use crate::utils::constants::DEFAULT_CONFIG_PATH;

/// Load the config file. Only the default path may be missing, in which case built-in defaults apply.
pub async fn run(config_path: &str) -> Result<DemoConfig> {
    let path = Path::new(config_path);
    if config_path == DEFAULT_CONFIG_PATH && !path.exists() {
        info!("'{}' not found, using defaults", config_path);
        return parse_config("{}")
            .await
            .map_err(|e| anyhow!("Invalid default config: {}", e));
    }
    file_to_config(path)
        .await
        .map_err(|e| anyhow!("Invalid config: {}", e))
}
