//! Chat-completions client for OpenAI-compatible endpoints.
//!
//! Works against DeepSeek (`https://api.deepseek.com`) and OpenAI
//! (`https://api.openai.com/v1`), or anything else speaking the same
//! `/chat/completions` dialect.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Generation, GenerationError, GenerationRequest, Generator};
use crate::config::Credentials;

/// OpenAI-compatible chat-completions client
pub struct OpenAiCompatibleClient {
    /// Endpoint root, without trailing slash
    base_url: String,
    /// Bearer token
    api_key: String,
    /// Model identifier sent with every request
    model: String,
    /// HTTP client
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u64,
}

impl OpenAiCompatibleClient {
    /// Create a client for an endpoint
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create from resolved credentials
    pub fn from_credentials(credentials: &Credentials, model: &str) -> Self {
        Self::new(&credentials.base_url, &credentials.api_key, model)
    }

    /// Model this client sends requests for
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Endpoint root
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn body<'a>(&'a self, request: &'a GenerationRequest) -> ChatCompletionBody<'a> {
        ChatCompletionBody {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

/// Map a non-success HTTP status to a generation error
fn status_error(status: u16, body: String) -> GenerationError {
    match status {
        401 | 403 => GenerationError::Auth { status },
        429 => GenerationError::Quota,
        _ => GenerationError::Http { status, body },
    }
}

/// Parse a chat-completions response body
fn parse_completion(body: &str) -> Result<Generation, GenerationError> {
    let response: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::Malformed(format!("undecodable body: {}", e)))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::Malformed("response has no choices".to_string()))?;

    let content = choice.message.content.unwrap_or_default();
    if content.trim().is_empty() {
        return Err(GenerationError::Empty);
    }

    Ok(Generation {
        content,
        model: response.model,
        tokens_used: response.usage.map(|u| u.total_tokens),
    })
}

#[async_trait]
impl Generator for OpenAiCompatibleClient {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerationError> {
        let response = self
            .client
            .post(self.url("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&self.body(request))
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(status_error(status.as_u16(), body));
        }

        let generation = parse_completion(&body)?;
        debug!(
            model = generation.model.as_deref().unwrap_or(&self.model),
            tokens = generation.tokens_used,
            "Completion received"
        );
        Ok(generation)
    }

    async fn health_check(&self) -> Result<(), GenerationError> {
        let response = self
            .client
            .get(self.url("models"))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), body));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = OpenAiCompatibleClient::new("https://api.deepseek.com/", "key", "deepseek-chat");
        assert_eq!(client.base_url(), "https://api.deepseek.com");
        assert_eq!(
            client.url("chat/completions"),
            "https://api.deepseek.com/chat/completions"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let client = OpenAiCompatibleClient::new("https://example.test/v1", "key", "test-model");
        let request = GenerationRequest::new("be terse", "hello", 0.3);

        let json = serde_json::to_value(client.body(&request)).unwrap();
        assert_eq!(json["model"], "test-model");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], "be terse");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "hello");
        assert!(json.get("max_tokens").is_none());

        let bounded = request.with_max_tokens(Some(256));
        let json = serde_json::to_value(client.body(&bounded)).unwrap();
        assert_eq!(json["max_tokens"], 256);
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{
            "model": "deepseek-chat",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Findings here"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;

        let generation = parse_completion(body).unwrap();
        assert_eq!(generation.content, "Findings here");
        assert_eq!(generation.model.as_deref(), Some("deepseek-chat"));
        assert_eq!(generation.tokens_used, Some(15));
    }

    #[test]
    fn test_parse_completion_failures() {
        assert!(matches!(
            parse_completion("not json"),
            Err(GenerationError::Malformed(_))
        ));
        assert!(matches!(
            parse_completion(r#"{"choices": []}"#),
            Err(GenerationError::Malformed(_))
        ));
        assert!(matches!(
            parse_completion(r#"{"choices": [{"message": {"content": "   "}}]}"#),
            Err(GenerationError::Empty)
        ));
        assert!(matches!(
            parse_completion(r#"{"choices": [{"message": {"content": null}}]}"#),
            Err(GenerationError::Empty)
        ));
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(status_error(401, String::new()), GenerationError::Auth { status: 401 }));
        assert!(matches!(status_error(403, String::new()), GenerationError::Auth { status: 403 }));
        assert!(matches!(status_error(429, String::new()), GenerationError::Quota));
        assert!(matches!(
            status_error(502, "bad gateway".to_string()),
            GenerationError::Http { status: 502, .. }
        ));
    }
}
