//! Language model completion boundary
//!
//! The orchestrator hands an assembled prompt to a [`CompletionProvider`] and
//! returns whatever text comes back. [`ChatCompletionClient`] speaks the
//! OpenAI-compatible `/chat/completions` protocol, which Groq, OpenRouter,
//! Together and local servers all accept.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_COMPLETION_ENDPOINT: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_COMPLETION_MODEL: &str = "llama3-70b-8192";
pub const DEFAULT_API_KEY_ENV: &str = "GROQ_API_KEY";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful coding assistant. Answer questions about the user's codebase using the code excerpts provided. Each excerpt starts with a comment naming its file.";

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("Completion provider not configured: {message}")]
    NotConfigured { message: String },

    #[error("Completion request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Completion API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Completion response contained no content")]
    EmptyResponse,

    #[error("Malformed completion response: {reason}")]
    MalformedResponse { reason: String },
}

/// Something that can turn a prompt into an answer
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// Settings for the chat completion client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Base URL; `/chat/completions` is appended
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    /// Environment variable holding the bearer token
    pub api_key_env: String,
    pub system_prompt: String,
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_COMPLETION_ENDPOINT.to_string(),
            model: DEFAULT_COMPLETION_MODEL.to_string(),
            temperature: 0.3,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiErrorDetail {
    Structured { message: String },
    Plain(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatResponse {
    Success(ChatCompletion),
    Error(ApiErrorEnvelope),
}

/// Extract the answer text from a response body.
fn parse_completion(status: u16, body: &str) -> Result<String, CompletionError> {
    let parsed = serde_json::from_str::<ChatResponse>(body);
    let success = (200..300).contains(&status);

    match parsed {
        Ok(ChatResponse::Error(envelope)) => {
            let message = match envelope.error {
                ApiErrorDetail::Structured { message } | ApiErrorDetail::Plain(message) => message,
            };
            Err(CompletionError::Api { status, message })
        }
        Ok(ChatResponse::Success(_)) | Err(_) if !success => Err(CompletionError::Api {
            status,
            message: body.trim().chars().take(500).collect(),
        }),
        Ok(ChatResponse::Success(completion)) => completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(CompletionError::EmptyResponse),
        Err(e) => Err(CompletionError::MalformedResponse {
            reason: e.to_string(),
        }),
    }
}

/// Client for an OpenAI-compatible chat completion endpoint
#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    http: reqwest::Client,
    config: CompletionConfig,
}

impl ChatCompletionClient {
    pub fn new(config: CompletionConfig) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    pub fn url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        )
    }

    fn api_key(&self) -> Result<String, CompletionError> {
        std::env::var(&self.config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| CompletionError::NotConfigured {
                message: format!("set {} to enable answers", self.config.api_key_env),
            })
    }
}

#[async_trait]
impl CompletionProvider for ChatCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let api_key = self.api_key()?;
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.config.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        tracing::debug!(
            "Requesting completion from {} ({} prompt chars)",
            self.config.model,
            prompt.chars().count()
        );
        let response = self
            .http
            .post(self.url())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        parse_completion(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"It hashes the password."}}]}"#;
        assert_eq!(parse_completion(200, body).unwrap(), "It hashes the password.");
    }

    #[test]
    fn test_parse_empty_content() {
        for body in [
            r#"{"choices":[]}"#,
            r#"{"choices":[{"message":null}]}"#,
            r#"{"choices":[{"message":{"role":"assistant"}}]}"#,
            r#"{"choices":[{"message":{"content":"   "}}]}"#,
        ] {
            assert!(
                matches!(parse_completion(200, body), Err(CompletionError::EmptyResponse)),
                "body: {body}"
            );
        }
    }

    #[test]
    fn test_parse_api_error() {
        let body = r#"{"error":{"message":"Invalid API Key","type":"invalid_request_error"}}"#;
        match parse_completion(401, body) {
            Err(CompletionError::Api { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid API Key");
            }
            other => panic!("unexpected result: {other:?}"),
        }

        // Some servers send a bare string and a 200 status
        let body = r#"{"error":"model overloaded"}"#;
        assert!(matches!(
            parse_completion(200, body),
            Err(CompletionError::Api { status: 200, .. })
        ));
    }

    #[test]
    fn test_parse_non_json_error_status() {
        match parse_completion(502, "<html>Bad Gateway</html>") {
            Err(CompletionError::Api { status, message }) => {
                assert_eq!(status, 502);
                assert!(message.contains("Bad Gateway"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_parse_malformed_success() {
        assert!(matches!(
            parse_completion(200, "not json"),
            Err(CompletionError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "llama3-70b-8192",
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "sys",
                },
                ChatMessage {
                    role: "user",
                    content: "Q: why?\nA:",
                },
            ],
            temperature: 0.3,
            max_tokens: None,
        };
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "llama3-70b-8192");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "Q: why?\nA:");
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_defaults_and_url() {
        let client = ChatCompletionClient::new(CompletionConfig {
            endpoint: "http://localhost:1234/v1/".to_string(),
            ..CompletionConfig::default()
        })
        .unwrap();

        assert_eq!(client.url(), "http://localhost:1234/v1/chat/completions");
        assert_eq!(client.config().model, "llama3-70b-8192");
        assert!((client.config().temperature - 0.3).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let client = ChatCompletionClient::new(CompletionConfig {
            api_key_env: "CODEQA_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..CompletionConfig::default()
        })
        .unwrap();

        match client.complete("prompt").await {
            Err(CompletionError::NotConfigured { message }) => {
                assert!(message.contains("CODEQA_TEST_KEY_THAT_IS_NEVER_SET"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
