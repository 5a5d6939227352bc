//! One-shot tool discovery

use std::collections::HashMap;

use crate::error::{McpClientError, Result};
use crate::protocol::ToolDescriptor;
use crate::session::ToolServer;

/// Name and description of a tool, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSummary<'a> {
  pub name: &'a str,
  pub description: &'a str,
}

/// Immutable set of operations a tool server advertised at startup.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
  tools: Vec<ToolDescriptor>,
  index: HashMap<String, usize>,
}

impl ToolCatalog {
  /// Query the server once and index the advertised operations.
  pub async fn build(server: &dyn ToolServer) -> Result<Self> {
    let tools = server.list_operations().await?;
    Self::from_descriptors(tools)
  }

  /// Index descriptors, rejecting duplicate names. Order is preserved.
  pub fn from_descriptors(tools: Vec<ToolDescriptor>) -> Result<Self> {
    let mut index = HashMap::with_capacity(tools.len());
    for (position, tool) in tools.iter().enumerate() {
      if index.insert(tool.name.clone(), position).is_some() {
        return Err(McpClientError::DuplicateTool(tool.name.clone()));
      }
    }
    Ok(Self { tools, index })
  }

  pub fn describe(&self) -> Vec<ToolSummary<'_>> {
    self
      .tools
      .iter()
      .map(|tool| ToolSummary {
        name: &tool.name,
        description: &tool.description,
      })
      .collect()
  }

  pub fn lookup(&self, name: &str) -> Option<&ToolDescriptor> {
    self.index.get(name).map(|&position| &self.tools[position])
  }

  pub fn descriptors(&self) -> &[ToolDescriptor] {
    &self.tools
  }

  pub fn len(&self) -> usize {
    self.tools.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tools.is_empty()
  }
}
