//! Version 1 of the command surface consumed by the UI shell.
//!
//! Commands are intentionally thin wrappers that validate input, execute work
//! on background threads where needed, and return JSON-friendly payloads.
//! Errors are stringified here and nowhere else; the components underneath
//! keep their typed errors.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use time::OffsetDateTime;
use tokio::task::spawn_blocking;

use crate::agents::adapter::{AiModel, ChatMessage, ChatRole, CompletionResult};
use crate::agents::registry::ProviderDescriptor;
use crate::db::DbPool;
use crate::model_manager::ModelRouter;
use crate::secrets::SecretStore;
use crate::settings::{self, WEATHER_API_KEY};

/// Shared state handed to every command.
#[derive(Clone)]
pub struct ApiState {
    pub db: DbPool,
    pub router: Arc<ModelRouter>,
    pub secrets: Arc<SecretStore>,
}

/// Simple health-check endpoint for UI components.
pub fn ping() -> serde_json::Value {
    serde_json::json!({
        "ok": true,
        "ts": OffsetDateTime::now_utc().unix_timestamp(),
    })
}

/// Read the stored weather API key, decrypted, or `""` when unset.
pub async fn settings_get_api_key(state: &ApiState) -> Result<String, String> {
    let pool = state.db.clone();
    let store = state.secrets.clone();
    spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        settings::get_secret(&conn, &store, WEATHER_API_KEY).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| e.to_string())?
}

/// Encrypt and store the weather API key. An empty value clears it.
pub async fn settings_set_api_key(state: &ApiState, value: String) -> Result<(), String> {
    let pool = state.db.clone();
    let store = state.secrets.clone();
    spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        settings::set_secret(&conn, &store, WEATHER_API_KEY, &value).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| e.to_string())?
}

/// List the registered provider catalogue.
pub fn ai_list_providers(state: &ApiState) -> Vec<ProviderDescriptor> {
    state.router.registry().descriptors()
}

/// ID of the provider currently routing completions.
pub fn ai_get_active_provider(state: &ApiState) -> String {
    state.router.active_provider()
}

/// Switch the active provider; unknown IDs are rejected.
pub fn ai_set_active_provider(state: &ApiState, id: &str) -> Result<(), String> {
    state
        .router
        .set_active_provider(id)
        .map_err(|e| e.to_string())
}

/// List models from the active provider.
pub async fn ai_list_models(state: &ApiState) -> Result<Vec<AiModel>, String> {
    state
        .router
        .list_local_models()
        .await
        .map_err(|e| e.to_string())
}

#[derive(Deserialize)]
pub struct AiChatMessageInput {
    pub role: String,
    pub content: String,
}

#[derive(Deserialize)]
pub struct AiChatInput {
    pub model: String,
    pub messages: Vec<AiChatMessageInput>,
    pub options: Option<Value>,
}

/// Execute a chat completion through the router.
pub async fn ai_chat(state: &ApiState, input: AiChatInput) -> Result<CompletionResult, String> {
    let messages: Vec<ChatMessage> = input
        .messages
        .iter()
        .map(|m| ChatMessage {
            role: ChatRole::from_label(&m.role),
            content: m.content.clone(),
            timestamp: None,
        })
        .collect();
    state
        .router
        .generate_response(&input.model, &messages, input.options)
        .await
        .map_err(|e| e.to_string())
}

/// Probe the active provider by asking it for its model list.
pub async fn ai_provider_health(state: &ApiState) -> serde_json::Value {
    let provider = state.router.active_provider();
    match state.router.list_local_models().await {
        Ok(models) => serde_json::json!({
            "provider": provider,
            "healthy": true,
            "message": format!("{} models available", models.len()),
        }),
        Err(err) => serde_json::json!({
            "provider": provider,
            "healthy": false,
            "message": err.to_string(),
        }),
    }
}

/// Structured AI runtime event surfaced for diagnostics.
#[derive(serde::Serialize)]
pub struct AiRuntimeEvent {
    pub id: String,
    pub ts: i64,
    pub level: String,
    pub code: Option<String>,
    pub message: String,
    pub explain: Option<String>,
    pub data: Option<serde_json::Value>,
}

/// Return recent AI runtime events for diagnostics.
pub async fn list_ai_events(
    state: &ApiState,
    limit: Option<usize>,
) -> Result<Vec<AiRuntimeEvent>, String> {
    let conn = state.db.get().map_err(|e| e.to_string())?;

    let mut events = Vec::new();
    if let Some(limit) = limit {
        let mut stmt = conn
            .prepare(
                "SELECT id, ts, level, code, message, explain, data FROM event_log WHERE module = 'ai.runtime' ORDER BY ts DESC LIMIT ?1",
            )
            .map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map([limit as i64], map_ai_event)
            .map_err(|e| e.to_string())?;
        for row in rows {
            events.push(row.map_err(|e| e.to_string())?);
        }
        return Ok(events);
    }

    let mut stmt = conn
        .prepare(
            "SELECT id, ts, level, code, message, explain, data FROM event_log WHERE module = 'ai.runtime' ORDER BY ts DESC",
        )
        .map_err(|e| e.to_string())?;
    let rows = stmt
        .query_map([], map_ai_event)
        .map_err(|e| e.to_string())?;
    for row in rows {
        events.push(row.map_err(|e| e.to_string())?);
    }
    Ok(events)
}

fn map_ai_event(row: &rusqlite::Row) -> rusqlite::Result<AiRuntimeEvent> {
    let data_str: Option<String> = row.get(6)?;
    let data = data_str.and_then(|raw| serde_json::from_str(&raw).ok());
    Ok(AiRuntimeEvent {
        id: row.get(0)?,
        ts: row.get(1)?,
        level: row.get(2)?,
        code: row.get(3)?,
        message: row.get(4)?,
        explain: row.get(5)?,
        data,
    })
}
