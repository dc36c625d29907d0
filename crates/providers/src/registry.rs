//! Provider registry - the fixed set of specialist providers.
//!
//! Iteration order is registry order ([`ProviderName::ALL`]), which is also
//! the order dispatch-announcement events are emitted in.

use std::sync::Arc;

use tracing::info;

use wealthdesk_core::plan::ProviderName;
use wealthdesk_core::provider::Provider;

use crate::compliance::ComplianceProvider;
use crate::context::ContextProvider;
use crate::quant::QuantProvider;
use crate::research::ResearchProvider;

/// Registry holding one provider per family, in registry order.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Register a provider. Replaces any existing provider for the same
    /// family and keeps the registry in [`ProviderName::ALL`] order.
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        let name = provider.name();
        info!(provider = %name, "Registered provider");
        self.providers.retain(|p| p.name() != name);
        self.providers.push(provider);
        self.providers.sort_by_key(|p| {
            ProviderName::ALL
                .iter()
                .position(|n| *n == p.name())
                .unwrap_or(usize::MAX)
        });
    }

    /// Get a provider by name.
    pub fn get(&self, name: ProviderName) -> Option<&Arc<dyn Provider>> {
        self.providers.iter().find(|p| p.name() == name)
    }

    /// Iterate providers in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Provider>> {
        self.providers.iter()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the standard four-provider registry.
pub fn default_registry(advisor_name: &str) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(ContextProvider::new(advisor_name)));
    registry.register(Arc::new(QuantProvider));
    registry.register(Arc::new(ComplianceProvider));
    registry.register(Arc::new(ResearchProvider));
    registry
}
