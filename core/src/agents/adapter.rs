//! Backend adapters that execute model listing and chat completion against
//! a provider runtime.
//!
//! All live runtimes sit behind the proxy's uniform two-endpoint contract
//! (`GET {base}/models`, `POST {base}/generate`), so a single [`RemoteBackend`]
//! serves every one of them and only the base URL differs. The [`MockBackend`]
//! is a pure function of its inputs and never touches the network, which keeps
//! the routing layer testable offline.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use super::providers::MOCK_DISPLAY_NAME;
use crate::errors::HearthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    /// Normalise a free-form role label; anything unrecognised becomes `user`.
    pub fn from_label(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "system" => Self::System,
            "assistant" => Self::Assistant,
            _ => Self::User,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    Active,
    Inactive,
    Loading,
}

impl ModelStatus {
    /// Coerce a status label from a provider payload; unknown strings and
    /// missing fields read as `active`.
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some("inactive") => Self::Inactive,
            Some("loading") => Self::Loading,
            _ => Self::Active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiModel {
    pub id: String,
    pub name: String,
    pub status: ModelStatus,
    pub description: String,
}

impl AiModel {
    /// Only active models may be offered for selection.
    pub fn selectable(&self) -> bool {
        self.status == ModelStatus::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiUsage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResult {
    pub message: ChatMessage,
    pub usage: Option<AiUsage>,
}

/// HTTP adapter for a runtime behind the uniform proxy contract.
pub struct RemoteBackend {
    pub id: String,
    pub display_name: String,
    pub base_url: String,
    client: Client,
}

impl RemoteBackend {
    pub fn new(id: &str, display_name: &str, base_url: &str, client: Client) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub async fn list_models(&self) -> Result<Vec<AiModel>, HearthError> {
        let url = format!("{}/models", self.base_url);
        let response =
            self.client
                .get(url)
                .send()
                .await
                .map_err(|err| HearthError::ProviderUnreachable {
                    provider: self.display_name.clone(),
                    detail: describe_transport(&err),
                })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HearthError::ProviderUnreachable {
                provider: self.display_name.clone(),
                detail: format!("model listing returned status {status}"),
            });
        }

        let body: Value =
            response
                .json()
                .await
                .map_err(|_| HearthError::ProviderUnreachable {
                    provider: self.display_name.clone(),
                    detail: "model listing body was not valid JSON".to_string(),
                })?;

        let entries = body
            .as_array()
            .ok_or_else(|| HearthError::ProviderUnreachable {
                provider: self.display_name.clone(),
                detail: "model listing body was not a JSON array".to_string(),
            })?;

        // Every entry is kept, coerced field by field, so the caller sees the
        // backend's list order and length untouched.
        Ok(entries.iter().map(map_model_entry).collect())
    }

    pub async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: Option<&Value>,
    ) -> Result<CompletionResult, HearthError> {
        let url = format!("{}/generate", self.base_url);
        let mut payload = serde_json::json!({
            "model": model,
            "messages": messages,
        });
        if let (Value::Object(body), Some(Value::Object(extra))) = (&mut payload, options) {
            for (key, value) in extra {
                body.insert(key.clone(), value.clone());
            }
        }

        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|err| HearthError::ProviderError {
                provider: self.display_name.clone(),
                detail: describe_transport(&err),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HearthError::ProviderError {
                provider: self.display_name.clone(),
                detail: format!("generation returned status {status}"),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|_| HearthError::ProviderError {
                provider: self.display_name.clone(),
                detail: "generation body was not valid JSON".to_string(),
            })?;

        let content = body
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| HearthError::ProviderError {
                provider: self.display_name.clone(),
                detail: "no content received".to_string(),
            })?;

        Ok(CompletionResult {
            message: assistant_message(content),
            usage: extract_usage(&body),
        })
    }
}

/// Deterministic stand-in used for offline work and tests.
pub struct MockBackend;

impl MockBackend {
    pub fn list_models(&self) -> Vec<AiModel> {
        vec![
            AiModel {
                id: "mock-model-1".to_string(),
                name: "Mock Model 1".to_string(),
                status: ModelStatus::Active,
                description: "Mock model for testing".to_string(),
            },
            AiModel {
                id: "mock-model-2".to_string(),
                name: "Mock Model 2".to_string(),
                status: ModelStatus::Active,
                description: "Mock model for testing".to_string(),
            },
        ]
    }

    pub fn complete(&self, model: &str, messages: &[ChatMessage]) -> CompletionResult {
        let last_content = messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        let content = format!("Mock response to \"{last_content}\" from model {model}");
        CompletionResult {
            message: assistant_message(&content),
            usage: Some(AiUsage {
                prompt_tokens: Some(0),
                completion_tokens: Some(0),
                total_tokens: Some(0),
            }),
        }
    }
}

/// Closed set of backend implementations behind one capability surface.
pub enum BackendAdapter {
    Remote(RemoteBackend),
    Mock(MockBackend),
}

impl BackendAdapter {
    pub fn display_name(&self) -> &str {
        match self {
            Self::Remote(remote) => &remote.display_name,
            Self::Mock(_) => MOCK_DISPLAY_NAME,
        }
    }

    pub async fn list_models(&self) -> Result<Vec<AiModel>, HearthError> {
        match self {
            Self::Remote(remote) => remote.list_models().await,
            Self::Mock(mock) => Ok(mock.list_models()),
        }
    }

    /// Execute a completion. The request is validated before any backend is
    /// contacted, so a rejected request never produces network traffic.
    pub async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: Option<Value>,
    ) -> Result<CompletionResult, HearthError> {
        if model.is_empty() {
            return Err(HearthError::InvalidRequest("model is required"));
        }
        if messages.is_empty() {
            return Err(HearthError::InvalidRequest(
                "at least one message is required",
            ));
        }
        match self {
            Self::Remote(remote) => remote.complete(model, messages, options.as_ref()).await,
            Self::Mock(mock) => Ok(mock.complete(model, messages)),
        }
    }
}

fn assistant_message(content: &str) -> ChatMessage {
    ChatMessage {
        role: ChatRole::Assistant,
        content: content.to_string(),
        timestamp: Some(OffsetDateTime::now_utc().unix_timestamp()),
    }
}

fn map_model_entry(entry: &Value) -> AiModel {
    let id = entry.get("id").and_then(Value::as_str);
    let name = entry.get("name").and_then(Value::as_str);
    AiModel {
        id: id.or(name).unwrap_or_default().to_string(),
        name: name.or(id).unwrap_or_default().to_string(),
        status: ModelStatus::from_label(entry.get("status").and_then(Value::as_str)),
        description: entry
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}

fn extract_usage(body: &Value) -> Option<AiUsage> {
    body.get("usage")
        .and_then(Value::as_object)
        .map(|usage| AiUsage {
            prompt_tokens: usage_field(usage, "prompt_tokens", "promptTokens"),
            completion_tokens: usage_field(usage, "completion_tokens", "completionTokens"),
            total_tokens: usage_field(usage, "total_tokens", "totalTokens"),
        })
}

fn usage_field(usage: &serde_json::Map<String, Value>, snake: &str, camel: &str) -> Option<u32> {
    usage
        .get(snake)
        .or_else(|| usage.get(camel))
        .and_then(Value::as_u64)
        .map(|v| v as u32)
}

fn describe_transport(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        "connection failed".to_string()
    } else {
        "transport error".to_string()
    }
}
