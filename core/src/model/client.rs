//! Model client
//!
//! Routes chat requests to the provider named by the model id

use std::sync::Arc;

use super::error::{ModelError, Result};
use super::registry::ProviderRegistryRef;
use super::types::{ChatRequest, ChatResponse};

/// Model client
///
/// Provides a unified interface for interacting with different LLM providers.
pub struct ModelClient {
  registry: ProviderRegistryRef,
}

impl ModelClient {
  /// Create a new model client
  pub fn new(registry: ProviderRegistryRef) -> Self {
    Self { registry }
  }

  /// Send a chat completion request
  pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
    let provider = self.select_provider(&request.model).await?;

    let mut request = request;
    request.model = get_model_name(&request.model).to_string();

    provider.chat_completion(request).await
  }

  /// Select the appropriate provider for a model
  async fn select_provider(&self, model: &str) -> Result<Arc<dyn super::ModelProvider>> {
    if let Some(provider_id) = get_provider_id(model) {
      return self
        .registry
        .get(provider_id)
        .await
        .ok_or_else(|| ModelError::ProviderNotFound(provider_id.to_string()));
    }

    self.registry.get_default().await
  }
}

/// Helper to parse model ID
///
/// Returns (provider_id, model_name)
pub fn parse_model_id(model_id: &str) -> (Option<&str>, &str) {
  if let Some((provider_id, model_name)) = model_id.split_once('/') {
    return (Some(provider_id), model_name);
  }
  (None, model_id)
}

/// Get provider ID from model ID
pub fn get_provider_id(model_id: &str) -> Option<&str> {
  parse_model_id(model_id).0
}

/// Get just the model name without provider prefix
pub fn get_model_name(model_id: &str) -> &str {
  parse_model_id(model_id).1
}
