use serde::Deserialize;

use crate::utils::constants::{
    DEFAULT_AUTHORIZATION_PROVIDER_URL, DEFAULT_CLIENT_NAME, DEFAULT_REQUEST_TIMEOUT_MS,
    DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_RETRY_MAX_DELAY_MS,
    DEFAULT_SOFTWARE_ID,
};

/// ================================
/// Full demo configuration
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DemoConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Known domains, in display order. Empty means the built-in table.
    #[serde(default)]
    pub domains: Vec<DomainEntry>,
}

/// ================================
/// Global settings
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SettingsConfig {
    pub retry: Option<RetryConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    pub attempts: Option<u32>,
    /// will be mutiply by 2 on every attempt until max_delay_ms
    pub base_delay_ms: Option<u64>,
    /// invariant: >= base_delay_ms
    pub max_delay_ms: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: Some(DEFAULT_RETRY_ATTEMPTS),
            base_delay_ms: Some(DEFAULT_RETRY_BASE_DELAY_MS),
            max_delay_ms: Some(DEFAULT_RETRY_MAX_DELAY_MS),
        }
    }
}

/// ================================
/// Authorization provider
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Base URL of the authorization provider. Parsed at bootstrap, never trusted blindly.
    #[serde(default = "default_provider_url")]
    pub url: String,
    #[serde(default = "default_client_name")]
    pub client_name: String,
    #[serde(default = "default_software_id")]
    pub software_id: String,
    #[serde(default = "default_software_version")]
    pub software_version: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            url: default_provider_url(),
            client_name: default_client_name(),
            software_id: default_software_id(),
            software_version: default_software_version(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// ================================
/// Token storage
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    /// JSON file holding tokens and the registered identity. `None` keeps everything in memory.
    pub path: Option<String>,
}

/// ================================
/// Domains
/// ================================
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct DomainEntry {
    pub domain: String,
    pub name: Option<String>,
}

impl DomainEntry {
    pub fn new(domain: &str, name: Option<&str>) -> Self {
        Self {
            domain: domain.to_owned(),
            name: name.map(|n| n.to_owned()),
        }
    }
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Compact,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

fn default_provider_url() -> String {
    DEFAULT_AUTHORIZATION_PROVIDER_URL.to_owned()
}

fn default_client_name() -> String {
    DEFAULT_CLIENT_NAME.to_owned()
}

fn default_software_id() -> String {
    DEFAULT_SOFTWARE_ID.to_owned()
}

fn default_software_version() -> String {
    env!("CARGO_PKG_VERSION").to_owned()
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}
