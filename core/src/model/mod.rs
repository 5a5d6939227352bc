//! mcpilot Model Layer
//!
//! Client side of the reasoning service: given a conversation and the tools
//! on offer, a provider answers with tool calls or a final message.
//!
//! Architecture:
//! - [ModelProvider] trait: defines the interface for all providers
//! - [ProviderRegistry]: manages provider registration and discovery
//! - [ModelClient]: routes requests by `provider/model` prefix or default
//! - Provider implementations in [providers]

pub mod client;
pub mod error;
pub mod provider;
pub mod registry;
pub mod types;

pub mod providers;

// Re-exports
pub use client::ModelClient;
pub use error::{ModelError, Result};
pub use provider::ModelProvider;
pub use registry::ProviderRegistry;
pub use types::*;

use std::sync::Arc;

/// Initialize the model layer from configuration
pub async fn init_model_layer(models: &mcpilot_config::ModelsConfig) -> Result<Arc<ModelClient>> {
  let registry = Arc::new(ProviderRegistry::new());

  providers::register_all_providers(&registry, models).await?;

  if let Some(provider_id) = client::get_provider_id(&models.model) {
    if !registry.has_provider(provider_id).await {
      return Err(ModelError::ProviderNotFound(provider_id.to_string()));
    }
  } else if !registry.has_provider(&models.provider).await {
    return Err(ModelError::ProviderNotFound(models.provider.clone()));
  }

  Ok(Arc::new(ModelClient::new(registry)))
}
