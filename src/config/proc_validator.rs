//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - provider URL must parse and use http(s)
//! - retry and logging invariants
//! - domain identifiers non-empty and unique

use std::collections::HashSet;

use tracing::{error, info};
use url::Url;

use crate::config::settings::{DemoConfig, DomainEntry, ProviderConfig, RetryConfig, SettingsConfig};
use crate::observability::metrics::get_metrics;

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub async fn validate_demo_config(cfg: &DemoConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_provider(&cfg.provider, &mut errors);
    validate_domains(&cfg.domains, &mut errors);

    if let Some(path) = &cfg.storage.path {
        if path.trim().is_empty() {
            errors.push("storage.path must not be empty when set".to_string());
        }
    }

    if errors.is_empty() {
        info!("config valid");
        Ok(())
    } else {
        error!("configuration validation errors ({}):", errors.len());
        for e in &errors {
            error!(" - {}", e);
        }
        get_metrics().await.config_validation_errors.inc();
        Err(errors)
    }
}

/// Parse the authorization provider URL. Only absolute http(s) URLs with a host are accepted.
pub fn parse_provider_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(format!("unsupported scheme '{}'", scheme)),
    }
    if url.host_str().map(str::is_empty).unwrap_or(true) {
        return Err("missing host".to_string());
    }
    Ok(url)
}

/// SETTINGS VALIDATION
fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if let Some(retry) = &settings.retry {
        validate_retry("settings.retry", retry, errors);
    }

    if let Some(logging) = &settings.logging {
        let valid = ["trace", "debug", "info", "warn", "error"];
        if !valid.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' invalid; allowed: {:?}",
                logging.level, valid
            ));
        }
    }
}

fn validate_retry(path: &str, retry: &RetryConfig, errors: &mut Vec<String>) {
    if let Some(attempts) = retry.attempts {
        if attempts == 0 {
            errors.push(format!("{}.attempts must be > 0", path));
        }
    }
    if let (Some(base), Some(max)) = (retry.base_delay_ms, retry.max_delay_ms) {
        if max < base {
            errors.push(format!(
                "{}.max_delay_ms ({}) must be >= base_delay_ms ({})",
                path, max, base
            ));
        }
    }
}

/// PROVIDER VALIDATION
fn validate_provider(provider: &ProviderConfig, errors: &mut Vec<String>) {
    if let Err(reason) = parse_provider_url(&provider.url) {
        errors.push(format!("provider.url '{}' is invalid: {}", provider.url, reason));
    }
    if provider.client_name.trim().is_empty() {
        errors.push("provider.client_name cannot be empty".to_string());
    }
    if provider.software_id.trim().is_empty() {
        errors.push("provider.software_id cannot be empty".to_string());
    }
    if provider.request_timeout_ms == 0 {
        errors.push("provider.request_timeout_ms must be > 0".to_string());
    }
}

/// DOMAINS VALIDATION
fn validate_domains(domains: &[DomainEntry], errors: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for (index, entry) in domains.iter().enumerate() {
        if entry.domain.trim().is_empty() {
            errors.push(format!("domains[{}].domain cannot be empty", index));
            continue;
        }
        if !seen.insert(entry.domain.as_str()) {
            errors.push(format!("domains[{}]: duplicate domain '{}'", index, entry.domain));
        }
    }
}
