//! Routing layer that owns the active provider selection and delegates
//! model listing and chat completion to the registered backends.
//!
//! The router snapshots the active provider ID at call entry, so a
//! completion that is still in flight when the selection changes finishes
//! against the provider it started with. Abandoning an in-flight call
//! mutates nothing.

use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::agents::adapter::{AiModel, BackendAdapter, ChatMessage, CompletionResult};
use crate::agents::providers::DEFAULT_PROVIDER;
use crate::agents::registry::ProviderRegistry;
use crate::db::DbPool;
use crate::errors::HearthError;
use crate::logging::log_event;

pub struct ModelRouter {
    registry: Arc<ProviderRegistry>,
    active: RwLock<String>,
    pool: Option<DbPool>,
}

impl ModelRouter {
    /// A fresh router starts with the designated default provider selected.
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            active: RwLock::new(DEFAULT_PROVIDER.to_string()),
            pool: None,
        }
    }

    /// Attach an event log so invocations and switches leave a trace.
    #[must_use]
    pub fn with_event_log(mut self, pool: DbPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Snapshot of the currently selected provider ID.
    pub fn active_provider(&self) -> String {
        match self.active.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Switch the active provider. An unknown ID is rejected and the previous
    /// selection stays in place.
    pub fn set_active_provider(&self, id: &str) -> Result<(), HearthError> {
        if !self.registry.contains(id) {
            return Err(HearthError::UnknownProvider(id.to_string()));
        }
        {
            let mut guard = match self.active.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *guard = id.to_string();
        }
        if let Some(pool) = &self.pool {
            if let Ok(conn) = pool.get() {
                let _ = log_event(
                    &conn,
                    "info",
                    Some("AI-0100"),
                    "ai.runtime",
                    "active provider switched",
                    None,
                    Some(serde_json::json!({ "provider": id })),
                );
            }
        }
        Ok(())
    }

    /// List models from the provider selected at call entry.
    pub async fn list_local_models(&self) -> Result<Vec<AiModel>, HearthError> {
        let provider_id = self.active_provider();
        self.adapter(&provider_id)?.list_models().await
    }

    /// Run a completion against the provider selected at call entry.
    pub async fn generate_response(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: Option<Value>,
    ) -> Result<CompletionResult, HearthError> {
        let provider_id = self.active_provider();
        let result = self.adapter(&provider_id)?.complete(model, messages, options).await;
        match &result {
            Ok(response) => self.log_invocation_success(&provider_id, model, response),
            Err(err) => self.log_invocation_failure(&provider_id, model, err),
        }
        result
    }

    fn adapter(&self, provider_id: &str) -> Result<&BackendAdapter, HearthError> {
        self.registry
            .get(provider_id)
            .ok_or_else(|| HearthError::UnknownProvider(provider_id.to_string()))
    }

    fn log_invocation_success(&self, provider_id: &str, model: &str, response: &CompletionResult) {
        let Some(pool) = self.pool.clone() else {
            return;
        };
        let preview = response.message.content.chars().take(200).collect::<String>();
        let provider = provider_id.to_string();
        let model = model.to_string();
        tokio::spawn(async move {
            if let Ok(conn) = pool.get() {
                let _ = log_event(
                    &conn,
                    "info",
                    Some("AI-0200"),
                    "ai.runtime",
                    "AI chat invocation succeeded",
                    Some("The selected provider produced a completion"),
                    Some(serde_json::json!({
                        "provider": provider,
                        "model": model,
                        "preview": preview,
                    })),
                );
            }
        });
    }

    fn log_invocation_failure(&self, provider_id: &str, model: &str, error: &HearthError) {
        let Some(pool) = self.pool.clone() else {
            return;
        };
        let provider = provider_id.to_string();
        let model = model.to_string();
        let code = error.code();
        let message = error.to_string();
        tokio::spawn(async move {
            if let Ok(conn) = pool.get() {
                let _ = log_event(
                    &conn,
                    "warn",
                    Some("AI-0201"),
                    "ai.runtime",
                    "AI provider invocation failed",
                    None,
                    Some(serde_json::json!({
                        "provider": provider,
                        "model": model,
                        "code": code,
                        "error": message,
                    })),
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::adapter::ChatRole;
    use crate::db::init_db;
    use std::time::Duration;
    use tempfile::TempDir;

    fn router() -> ModelRouter {
        let registry = Arc::new(ProviderRegistry::new().expect("registry"));
        ModelRouter::new(registry)
    }

    fn user_message(content: &str) -> ChatMessage {
        ChatMessage {
            role: ChatRole::User,
            content: content.to_string(),
            timestamp: None,
        }
    }

    #[test]
    fn default_selection_is_present_from_construction() {
        assert_eq!(router().active_provider(), "ollama");
    }

    #[test]
    fn unknown_provider_is_rejected_and_selection_retained() {
        let router = router();
        router.set_active_provider("lmstudio").expect("switch");
        match router.set_active_provider("openai") {
            Err(HearthError::UnknownProvider(id)) => assert_eq!(id, "openai"),
            other => panic!("expected UnknownProvider, got {other:?}"),
        }
        assert_eq!(router.active_provider(), "lmstudio");
    }

    #[tokio::test]
    async fn switching_scopes_subsequent_calls() {
        let router = router();
        router.set_active_provider("mock").expect("switch");

        let models = router.list_local_models().await.expect("models");
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].id, "mock-model-1");

        let result = router
            .generate_response("mock-model-1", &[user_message("ping")], None)
            .await
            .expect("completion");
        assert_eq!(
            result.message.content,
            "Mock response to \"ping\" from model mock-model-1"
        );
    }

    #[tokio::test]
    async fn invocations_and_switches_reach_the_event_log() {
        let dir = TempDir::new().expect("tempdir");
        let pool = init_db(dir.path().to_path_buf()).expect("init");
        let registry = Arc::new(ProviderRegistry::new().expect("registry"));
        let router = ModelRouter::new(registry).with_event_log(pool.clone());

        router.set_active_provider("mock").expect("switch");
        router
            .generate_response("mock-model-1", &[user_message("hello")], None)
            .await
            .expect("completion");

        // The invocation event is written from a spawned task.
        tokio::time::sleep(Duration::from_millis(100)).await;

        let conn = pool.get().expect("conn");
        let codes: Vec<String> = conn
            .prepare("SELECT code FROM event_log WHERE module = 'ai.runtime' ORDER BY ts")
            .expect("prepare")
            .query_map([], |row| row.get(0))
            .expect("query")
            .collect::<rusqlite::Result<_>>()
            .expect("rows");
        assert!(codes.contains(&"AI-0100".to_string()), "switch event missing");
        assert!(codes.contains(&"AI-0200".to_string()), "invocation event missing");
    }
}
