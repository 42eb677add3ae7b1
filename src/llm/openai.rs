//! Client for OpenAI-compatible `/chat/completions` endpoints.
//!
//! Works against OpenAI itself and the GitHub Models inference endpoint,
//! which speaks the same protocol.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;

use super::{ChatProvider, ChatRequest};
use crate::error::ProviderError;

const CLIENT_USER_AGENT: &str = "TeachersPet/1.0";

#[derive(Clone)]
pub struct OpenAiChatClient {
    client: Client,
    endpoint: String,
}

impl OpenAiChatClient {
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| ProviderError::Malformed("invalid API key header".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
        })
    }

    /// Build a client whose bearer token is read from `api_key_env`.
    pub fn from_env(
        base_url: &str,
        api_key_env: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let api_key = std::env::var(api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ProviderError::MissingCredential(api_key_env.to_string()))?;
        Self::new(&api_key, base_url, timeout)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatProvider for OpenAiChatClient {
    async fn generate(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        let response = self.client.post(&self.endpoint).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        first_choice(parsed)
    }
}

fn first_choice(parsed: ChatResponse) -> Result<String, ProviderError> {
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| ProviderError::Malformed("response contained no choices".to_string()))
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_choice_content() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"safe"}},{"message":{"content":"unsafe"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_choice(parsed).unwrap(), "safe");
    }

    #[test]
    fn test_empty_choices_is_malformed() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            first_choice(parsed),
            Err(ProviderError::Malformed(_))
        ));
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let client = OpenAiChatClient::new(
            "ghp_test",
            "https://models.inference.ai.azure.com",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "https://models.inference.ai.azure.com/chat/completions"
        );
    }
}
