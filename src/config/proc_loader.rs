use std::{fs, path::Path};

use regex::Regex;
use tracing::{debug, error};

use crate::config::error::ConfigError;
use crate::config::proc_validator;
use crate::config::settings::{DemoConfig, DomainEntry, LoggingConfig, RetryConfig};
use crate::utils::constants::DEFAULT_DOMAINS;

/// Load and validate config from YAML file
pub async fn file_to_config(path: &Path) -> Result<DemoConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let expanded = expand_env_vars(&content);
    parse_config(&expanded).await
}

pub async fn parse_config(content: &str) -> Result<DemoConfig, ConfigError> {
    let demo_config: DemoConfig = serde_yaml::from_str(content)
        .inspect_err(|e| error!("parse config error: {}", e))?;

    let demo_config = initiate_default_values(demo_config);
    debug!("validation config ...");
    proc_validator::validate_demo_config(&demo_config)
        .await
        .map_err(ConfigError::Invalid)?;

    Ok(demo_config)
}

/// Fill the optional sections so the rest of the crate never deals with `None` defaults.
pub fn initiate_default_values(mut config: DemoConfig) -> DemoConfig {
    if config.settings.logging.is_none() {
        config.settings.logging = Some(LoggingConfig::default());
    }
    if config.settings.retry.is_none() {
        config.settings.retry = Some(RetryConfig::default());
    }
    if config.domains.is_empty() {
        config.domains = default_domains();
    }
    config
}

pub fn default_domains() -> Vec<DomainEntry> {
    DEFAULT_DOMAINS
        .iter()
        .map(|(domain, name)| DomainEntry::new(domain, Some(name)))
        .collect()
}

fn expand_env_vars(input: &str) -> String {
    // ${VAR} or ${VAR:default}
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}").expect("static env var pattern");
    re.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}
