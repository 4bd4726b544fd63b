//! Immutable registry mapping provider IDs to backend adapters.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;

use super::adapter::{BackendAdapter, MockBackend, RemoteBackend};
use super::providers::{MOCK_DISPLAY_NAME, MOCK_PROVIDER_ID, PROVIDER_SEEDS};

/// Catalogue entry surfaced to the UI when listing providers.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderDescriptor {
    pub id: String,
    pub display_name: String,
    pub base_url: Option<String>,
}

/// The full provider set, built once at startup and never mutated.
pub struct ProviderRegistry {
    adapters: HashMap<String, BackendAdapter>,
    order: Vec<String>,
}

impl ProviderRegistry {
    /// Build the registry from the seed catalogue plus the mock, all remote
    /// adapters sharing one HTTP client.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(45))
            .user_agent("Hearth-Core/0.1")
            .build()
            .context("failed to construct HTTP client")?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        let mut adapters = HashMap::new();
        let mut order = Vec::new();
        for seed in PROVIDER_SEEDS {
            adapters.insert(
                seed.id.to_string(),
                BackendAdapter::Remote(RemoteBackend::new(
                    seed.id,
                    seed.display,
                    seed.base_url,
                    client.clone(),
                )),
            );
            order.push(seed.id.to_string());
        }
        adapters.insert(MOCK_PROVIDER_ID.to_string(), BackendAdapter::Mock(MockBackend));
        order.push(MOCK_PROVIDER_ID.to_string());
        Self { adapters, order }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.adapters.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&BackendAdapter> {
        self.adapters.get(id)
    }

    /// Descriptors in seed order, mock last.
    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        self.order
            .iter()
            .map(|id| {
                let base_url = PROVIDER_SEEDS
                    .iter()
                    .find(|seed| seed.id == id.as_str())
                    .map(|seed| seed.base_url.to_string());
                let display_name = self
                    .adapters
                    .get(id)
                    .map(BackendAdapter::display_name)
                    .unwrap_or(MOCK_DISPLAY_NAME)
                    .to_string();
                ProviderDescriptor {
                    id: id.clone(),
                    display_name,
                    base_url,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_holds_all_seeded_providers_and_the_mock() {
        let registry = ProviderRegistry::new().expect("registry");
        for id in ["ollama", "lmstudio", "llamacpp", "mock"] {
            assert!(registry.contains(id), "missing provider {id}");
            assert!(registry.get(id).is_some());
        }
        assert!(!registry.contains("openai"));
    }

    #[test]
    fn descriptors_follow_seed_order_with_mock_last() {
        let registry = ProviderRegistry::new().expect("registry");
        let descriptors = registry.descriptors();
        let ids: Vec<&str> = descriptors.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["ollama", "lmstudio", "llamacpp", "mock"]);
        assert_eq!(descriptors[0].display_name, "Ollama AI");
        assert!(descriptors[0].base_url.is_some());
        assert_eq!(descriptors[3].display_name, "Mock AI");
        assert!(descriptors[3].base_url.is_none());
    }
}
