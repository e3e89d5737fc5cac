//! ---
//! bakery_section: "04-reporting"
//! bakery_subsection: "module"
//! bakery_type: "source"
//! bakery_scope: "code"
//! bakery_description: "Chat-completions client used as the external narrative collaborator."
//! bakery_version: "v0.1.0"
//! bakery_owner: "tbd"
//! ---
use std::time::Duration;

use async_trait::async_trait;
use bakery_common::NarrativeConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::narrative::{NarrativeError, NarrativePrompt, TextGenerator};

/// Connection and sampling parameters for the chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl From<&NarrativeConfig> for OpenAiSettings {
    fn from(config: &NarrativeConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: config.timeout,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an OpenAI-compatible `/v1/chat/completions` endpoint.
pub struct OpenAiTextGenerator {
    client: reqwest::Client,
    settings: OpenAiSettings,
    api_key: String,
}

impl OpenAiTextGenerator {
    pub fn new(settings: OpenAiSettings, api_key: impl Into<String>) -> Result<Self, NarrativeError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self {
            client,
            settings,
            api_key: api_key.into(),
        })
    }

    /// Build the collaborator when a credential is present, once, at startup.
    pub fn from_config(config: &NarrativeConfig) -> Result<Option<Self>, NarrativeError> {
        let Some(api_key) = config.resolve_api_key() else {
            info!(
                env_var = %config.api_key_env,
                enabled = config.enabled,
                "text generation credential absent; local narratives only"
            );
            return Ok(None);
        };
        info!(endpoint = %config.endpoint, model = %config.model, "text generation enabled");
        Self::new(OpenAiSettings::from(config), api_key).map(Some)
    }
}

impl std::fmt::Debug for OpenAiTextGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiTextGenerator")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TextGenerator for OpenAiTextGenerator {
    async fn generate(&self, prompt: &NarrativePrompt) -> Result<String, NarrativeError> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let response = self
            .client
            .post(&self.settings.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NarrativeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await?;
        let parsed: ChatResponse = serde_json::from_slice(&body)
            .map_err(|err| NarrativeError::Malformed(err.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| NarrativeError::Malformed("response carried no choices".into()))?;

        let content = content.trim().to_owned();
        if content.is_empty() {
            return Err(NarrativeError::Empty);
        }
        debug!(chars = content.len(), "text generation completed");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    async fn spawn_endpoint(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/v1/chat/completions")
    }

    fn client(endpoint: String) -> OpenAiTextGenerator {
        let settings = OpenAiSettings {
            endpoint,
            model: "gpt-4o-mini".into(),
            temperature: 0.3,
            max_tokens: 300,
            timeout: Duration::from_secs(5),
        };
        OpenAiTextGenerator::new(settings, "test-key").unwrap()
    }

    fn prompt() -> NarrativePrompt {
        NarrativePrompt {
            system: "You are a bakery data analyst.".into(),
            user: "Average oven temperature: 210.3 °C".into(),
        }
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["model"], "gpt-4o-mini");
                assert_eq!(body["messages"][1]["content"], "Average oven temperature: 210.3 °C");
                Json(json!({
                    "choices": [{"index": 0, "message": {"role": "assistant", "content": " Ovens are steady. \n"}}]
                }))
            }),
        );
        let endpoint = spawn_endpoint(router).await;
        let text = client(endpoint).generate(&prompt()).await.unwrap();
        assert_eq!(text, "Ovens are steady.");
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream down") }),
        );
        let endpoint = spawn_endpoint(router).await;
        let err = client(endpoint).generate(&prompt()).await.unwrap_err();
        match err {
            NarrativeError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "upstream down");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_choices_are_malformed() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(json!({"choices": []})) }),
        );
        let endpoint = spawn_endpoint(router).await;
        let err = client(endpoint).generate(&prompt()).await.unwrap_err();
        assert!(matches!(err, NarrativeError::Malformed(_)), "{err}");
    }

    #[test]
    fn request_serializes_chat_shape() {
        let prompt = NarrativePrompt {
            system: "sys".into(),
            user: "usr".into(),
        };
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: 0.3,
            max_tokens: 300,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "usr");
        assert_eq!(value["max_tokens"], 300);
    }

    #[test]
    fn response_without_content_parses() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"index":0,"message":{"role":"assistant"}}]}"#)
                .unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }

    #[test]
    fn missing_credential_disables_collaborator() {
        let config = NarrativeConfig {
            api_key_env: "BAKERY_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..NarrativeConfig::default()
        };
        assert!(OpenAiTextGenerator::from_config(&config).unwrap().is_none());
    }
}
