//! Model provider implementations
//!
//! Every supported backend speaks the OpenAI chat-completions format; they
//! differ only in base URL and credentials.

use reqwest::Client;
use tracing::debug;

use mcpilot_config::ModelsConfig;

use super::error::{ModelError, Result};
use super::registry::ProviderRegistry;
use super::types::{ChatRequest, ChatResponse, ProviderConfig};

pub mod openai;

pub use openai::{
  LMSTUDIO, OLLAMA, OPENAI, OPENROUTER, OpenAICompatibleProvider, ProviderPreset,
};

/// Presets registered by [register_all_providers], in lookup order.
pub const PRESETS: &[ProviderPreset] = &[OPENAI, OPENROUTER, OLLAMA, LMSTUDIO];

/// Register every provider whose credentials are available
pub async fn register_all_providers(
  registry: &ProviderRegistry,
  models: &ModelsConfig,
) -> Result<()> {
  for preset in PRESETS {
    let api_key = match preset.api_key_env {
      Some(var) => match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Some(key),
        _ => {
          debug!(provider = preset.id, "skipping provider without {var}");
          continue;
        }
      },
      None => None,
    };

    let config = ProviderConfig {
      provider_id: preset.id.to_string(),
      api_key,
      base_url: provider_base_url(models, preset.id),
      timeout: Some(models.timeout_sec),
      ..Default::default()
    };
    registry
      .register(OpenAICompatibleProvider::new(*preset, config))
      .await;
  }

  // Set default provider from config
  if !models.provider.is_empty() {
    registry.set_default(&models.provider).await.ok();
  }

  Ok(())
}

fn provider_base_url(models: &ModelsConfig, provider_id: &str) -> Option<String> {
  if models.provider == provider_id {
    return models.base_url.clone();
  }
  None
}

// =============================================================================
// Helper functions for providers
// =============================================================================

/// Create a default HTTP client for providers
pub fn create_client(timeout: Option<u64>) -> Client {
  let timeout = std::time::Duration::from_secs(timeout.unwrap_or(120));

  Client::builder()
    .timeout(timeout)
    .build()
    .unwrap_or_else(|_| Client::new())
}

/// Build OpenAI-compatible request body
pub fn build_openai_request(request: &ChatRequest, model: &str) -> Result<serde_json::Value> {
  let mut body = serde_json::to_value(request)?;
  body["model"] = serde_json::Value::String(model.to_string());
  Ok(body)
}

/// Parse OpenAI-compatible response
pub fn parse_openai_response(body: &str) -> Result<ChatResponse> {
  let response: ChatResponse = serde_json::from_str(body)?;
  if response.choices.is_empty() {
    return Err(ModelError::InvalidResponse(
      "response contained no choices".to_string(),
    ));
  }
  Ok(response)
}
