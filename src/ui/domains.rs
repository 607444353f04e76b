use std::sync::Arc;

use tracing::debug;

use crate::config::proc_loader::default_domains;
use crate::config::settings::DomainEntry;
use crate::provider::TokenProvider;
use crate::ui::detail::DomainDetail;
use crate::ui::navigation::{Navigator, Screen};

/// Static domain table: identifier -> display name.
#[derive(Debug, Clone)]
pub struct DomainCatalog {
    entries: Vec<DomainEntry>,
}

impl Default for DomainCatalog {
    fn default() -> Self {
        Self::new(default_domains())
    }
}

impl DomainCatalog {
    pub fn new(entries: Vec<DomainEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[DomainEntry] {
        &self.entries
    }

    pub fn name_for(&self, domain: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.domain == domain)
            .and_then(|entry| entry.name.as_deref())
    }

    /// `"{name} ({domain})"` for mapped domains, `None` otherwise.
    pub fn title_for(&self, domain: &str) -> Option<String> {
        self.name_for(domain).map(|name| format!("{} ({})", name, domain))
    }
}

/// Domain list screen.
pub struct DomainList<P> {
    provider: Arc<P>,
    catalog: Arc<DomainCatalog>,
}

impl<P: TokenProvider> DomainList<P> {
    pub fn new(provider: Arc<P>, catalog: Arc<DomainCatalog>) -> Self {
        Self { provider, catalog }
    }

    /// Row labels: the title when the domain is mapped, the raw identifier otherwise.
    pub fn rows(&self) -> Vec<String> {
        self.catalog
            .entries()
            .iter()
            .map(|entry| {
                self.catalog
                    .title_for(&entry.domain)
                    .unwrap_or_else(|| entry.domain.clone())
            })
            .collect()
    }

    /// Select the row at `index` and navigate to its detail screen.
    pub fn select(&self, index: usize, navigator: &mut Navigator) -> Option<DomainDetail<P>> {
        let entry = self.catalog.entries().get(index)?;
        Some(self.open(&entry.domain, navigator))
    }

    /// Navigate to the detail screen of `domain`.
    pub fn open(&self, domain: &str, navigator: &mut Navigator) -> DomainDetail<P> {
        debug!("navigating to domain '{}'", domain);
        navigator.push(Screen::Domain(domain.to_owned()));
        DomainDetail::new(
            Arc::clone(&self.provider),
            domain.to_owned(),
            self.catalog.title_for(domain),
        )
    }
}
