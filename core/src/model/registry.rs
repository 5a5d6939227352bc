//! Provider Registry
//!
//! Manages registration and lookup of model providers

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::ModelProvider;
use super::error::{ModelError, Result};

/// Provider Registry
///
/// Providers are registered once at startup and looked up per request.
pub struct ProviderRegistry {
  providers: RwLock<HashMap<String, Arc<dyn ModelProvider>>>,
  default_provider: RwLock<Option<String>>,
}

impl Default for ProviderRegistry {
  fn default() -> Self {
    Self::new()
  }
}

impl ProviderRegistry {
  /// Create a new registry
  pub fn new() -> Self {
    Self {
      providers: RwLock::new(HashMap::new()),
      default_provider: RwLock::new(None),
    }
  }

  /// Register a provider
  pub async fn register<P: ModelProvider + 'static>(&self, provider: P) {
    let provider_id = provider.provider_id().to_string();
    self
      .providers
      .write()
      .await
      .insert(provider_id, Arc::new(provider));
  }

  /// Get a provider by ID
  pub async fn get(&self, provider_id: &str) -> Option<Arc<dyn ModelProvider>> {
    self.providers.read().await.get(provider_id).cloned()
  }

  /// Get the default provider
  pub async fn get_default(&self) -> Result<Arc<dyn ModelProvider>> {
    let default_id = self.default_provider.read().await.clone();
    let id = default_id.ok_or(ModelError::NoDefaultProvider)?;
    self
      .get(&id)
      .await
      .ok_or(ModelError::ProviderNotFound(id))
  }

  /// Set the default provider
  pub async fn set_default(&self, provider_id: &str) -> Result<()> {
    if !self.providers.read().await.contains_key(provider_id) {
      return Err(ModelError::ProviderNotFound(provider_id.to_string()));
    }

    *self.default_provider.write().await = Some(provider_id.to_string());
    Ok(())
  }

  /// Check if a provider exists
  pub async fn has_provider(&self, provider_id: &str) -> bool {
    self.providers.read().await.contains_key(provider_id)
  }
}

/// Reference-counted registry handle
pub type ProviderRegistryRef = Arc<ProviderRegistry>;
