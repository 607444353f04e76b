use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::cache::token_store::TokenStore;
use crate::config::error::ConfigError;
use crate::config::proc_validator::parse_provider_url;
use crate::config::settings::DemoConfig;
use crate::provider::cpa::CpaProvider;
use crate::provider::TokenProvider;
use crate::resilience::retry::RetrySettings;
use crate::ui::domains::{DomainCatalog, DomainList};

/// The provider and the static domain table, shared by every screen.
pub struct App<P> {
    provider: Arc<P>,
    catalog: Arc<DomainCatalog>,
}

impl<P: TokenProvider> App<P> {
    pub fn new(provider: Arc<P>, catalog: DomainCatalog) -> Self {
        Self {
            provider,
            catalog: Arc::new(catalog),
        }
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    pub fn catalog(&self) -> &DomainCatalog {
        &self.catalog
    }

    pub fn domain_list(&self) -> DomainList<P> {
        DomainList::new(Arc::clone(&self.provider), Arc::clone(&self.catalog))
    }
}

/// Build the single provider from configuration. Nothing is constructed when the URL is invalid.
pub fn bootstrap(config: &DemoConfig) -> Result<App<CpaProvider>, ConfigError> {
    let url = parse_provider_url(&config.provider.url).map_err(|reason| {
        ConfigError::InvalidProviderUrl {
            url: config.provider.url.clone(),
            reason,
        }
    })?;

    let store = match &config.storage.path {
        Some(path) => TokenStore::open(Path::new(path))?,
        None => TokenStore::in_memory(),
    };
    let retry = config
        .settings
        .retry
        .as_ref()
        .map(RetrySettings::from)
        .unwrap_or_default();

    let provider = CpaProvider::new(url, config.provider.clone(), store, retry)?;
    info!("authorization provider: {}", provider.authorization_provider_url());

    Ok(App::new(
        Arc::new(provider),
        DomainCatalog::new(config.domains.clone()),
    ))
}
