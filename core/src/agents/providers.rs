//! Static catalogue of the AI runtimes the proxy exposes.
//!
//! Every live runtime sits behind the same two-endpoint REST contract, so a
//! seed is nothing more than an ID, a display name, and a base URL. The set
//! is fixed at startup; adding a runtime means adding a seed here.

pub struct ProviderSeed {
    pub id: &'static str,
    pub display: &'static str,
    pub base_url: &'static str,
}

pub const PROVIDER_SEEDS: &[ProviderSeed] = &[
    ProviderSeed {
        id: "ollama",
        display: "Ollama AI",
        base_url: "http://localhost:5000/api/providers/ollama",
    },
    ProviderSeed {
        id: "lmstudio",
        display: "LM Studio",
        base_url: "http://localhost:5000/api/providers/lmstudio",
    },
    ProviderSeed {
        id: "llamacpp",
        display: "Llama.cpp",
        base_url: "http://localhost:5000/api/providers/llamacpp",
    },
];

pub const MOCK_PROVIDER_ID: &str = "mock";
pub const MOCK_DISPLAY_NAME: &str = "Mock AI";

/// Provider selected when no explicit choice has been made yet.
pub const DEFAULT_PROVIDER: &str = "ollama";
