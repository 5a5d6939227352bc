//! OpenAI-compatible provider
//!
//! Covers OpenAI itself plus OpenRouter, Ollama and LM Studio, which expose
//! the same `/chat/completions` endpoint.

use async_trait::async_trait;
use reqwest::Client;

use super::super::error::Result;
use super::super::provider::{ModelProvider, handle_response};
use super::super::types::{ChatRequest, ChatResponse, ProviderConfig};
use super::{build_openai_request, create_client, parse_openai_response};

/// Static description of one OpenAI-compatible backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderPreset {
  pub id: &'static str,
  pub name: &'static str,
  pub default_base_url: &'static str,
  /// Environment variable holding the API key; `None` for local servers
  pub api_key_env: Option<&'static str>,
}

pub const OPENAI: ProviderPreset = ProviderPreset {
  id: "openai",
  name: "OpenAI",
  default_base_url: "https://api.openai.com/v1",
  api_key_env: Some("OPENAI_API_KEY"),
};

pub const OPENROUTER: ProviderPreset = ProviderPreset {
  id: "openrouter",
  name: "OpenRouter",
  default_base_url: "https://openrouter.ai/api/v1",
  api_key_env: Some("OPENROUTER_API_KEY"),
};

pub const OLLAMA: ProviderPreset = ProviderPreset {
  id: "ollama",
  name: "Ollama",
  default_base_url: "http://localhost:11434/v1",
  api_key_env: None,
};

pub const LMSTUDIO: ProviderPreset = ProviderPreset {
  id: "lmstudio",
  name: "LM Studio",
  default_base_url: "http://localhost:1234/v1",
  api_key_env: None,
};

/// Provider speaking the chat-completions wire format
pub struct OpenAICompatibleProvider {
  preset: ProviderPreset,
  client: Client,
  config: ProviderConfig,
  base_url: String,
}

impl OpenAICompatibleProvider {
  /// Create a new provider
  pub fn new(preset: ProviderPreset, config: ProviderConfig) -> Self {
    let base_url = config
      .base_url
      .clone()
      .unwrap_or_else(|| preset.default_base_url.to_string());
    let client = create_client(config.timeout);

    Self {
      preset,
      client,
      config,
      base_url,
    }
  }

  /// Get the API endpoint URL
  fn endpoint(&self, path: &str) -> String {
    format!("{}/{}", self.base_url.trim_end_matches('/'), path)
  }
}

#[async_trait]
impl ModelProvider for OpenAICompatibleProvider {
  fn provider_id(&self) -> &'static str {
    self.preset.id
  }

  fn provider_name(&self) -> &'static str {
    self.preset.name
  }

  fn required_env_vars(&self) -> Vec<&'static str> {
    self.preset.api_key_env.into_iter().collect()
  }

  async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse> {
    let url = self.endpoint("chat/completions");
    let body = build_openai_request(&request, &request.model)?;

    let mut builder = self
      .client
      .post(&url)
      .header("Content-Type", "application/json");
    if let Some(api_key) = &self.config.api_key {
      builder = builder.bearer_auth(api_key);
    }
    for (name, value) in &self.config.headers {
      builder = builder.header(name.as_str(), value.as_str());
    }

    let response = builder.json(&body).send().await?;
    let response_text = handle_response(response).await?;
    parse_openai_response(&response_text)
  }

  fn config(&self) -> &ProviderConfig {
    &self.config
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;
  use serde_json::json;
  use wiremock::matchers::{header, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  use super::*;
  use crate::model::{Message, ModelError};

  fn provider_for(server: &MockServer, api_key: Option<&str>) -> OpenAICompatibleProvider {
    OpenAICompatibleProvider::new(
      OPENAI,
      ProviderConfig {
        provider_id: "openai".to_string(),
        api_key: api_key.map(str::to_string),
        base_url: Some(format!("{}/v1", server.uri())),
        timeout: Some(5),
        ..Default::default()
      },
    )
  }

  #[tokio::test]
  async fn posts_chat_completion_and_parses_tool_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/v1/chat/completions"))
      .and(header("authorization", "Bearer sk-test"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 1,
        "model": "gpt-4o",
        "choices": [{
          "index": 0,
          "message": {
            "role": "assistant",
            "content": null,
            "tool_calls": [{
              "id": "call_1",
              "type": "function",
              "function": { "name": "cluster_name", "arguments": "{}" }
            }]
          },
          "finish_reason": "tool_calls"
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12 }
      })))
      .expect(1)
      .mount(&server)
      .await;

    let provider = provider_for(&server, Some("sk-test"));
    let response = provider
      .chat_completion(ChatRequest {
        model: "gpt-4o".to_string(),
        messages: vec![Message::user("what cluster is this?")],
        ..Default::default()
      })
      .await
      .expect("chat completion");

    let calls = response.choices[0]
      .message
      .tool_calls
      .clone()
      .expect("tool calls");
    assert_eq!(calls[0].function.name, "cluster_name");
    assert_eq!(response.usage.total_tokens, 12);
  }

  #[tokio::test]
  async fn http_errors_become_model_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/v1/chat/completions"))
      .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
      .mount(&server)
      .await;

    let err = provider_for(&server, Some("sk-wrong"))
      .chat_completion(ChatRequest::default())
      .await
      .expect_err("unauthorized");
    assert!(matches!(err, ModelError::AuthError(_)), "unexpected: {err}");
  }

  #[tokio::test]
  async fn response_without_choices_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/v1/chat/completions"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "x", "choices": [] })))
      .mount(&server)
      .await;

    let err = provider_for(&server, None)
      .chat_completion(ChatRequest::default())
      .await
      .expect_err("no choices");
    assert!(matches!(err, ModelError::InvalidResponse(_)), "unexpected: {err}");
  }

  #[test]
  fn local_presets_need_no_key() {
    assert_eq!(OLLAMA.api_key_env, None);
    let provider = OpenAICompatibleProvider::new(OLLAMA, ProviderConfig::default());
    assert!(provider.required_env_vars().is_empty());
    assert_eq!(
      provider.endpoint("chat/completions"),
      "http://localhost:11434/v1/chat/completions"
    );
  }
}
