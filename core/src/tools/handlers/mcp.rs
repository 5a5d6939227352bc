use std::sync::Arc;

use mcpilot_mcp_client::ToolServer;

use crate::tools::context::{CapabilityError, ToolInvocation, ToolOutput};

/// Forwards invocations to the tool server process.
pub struct McpHandler {
  server: Arc<dyn ToolServer>,
}

impl McpHandler {
  pub fn new(server: Arc<dyn ToolServer>) -> Self {
    Self { server }
  }

  pub async fn handle(&self, invocation: ToolInvocation) -> Result<ToolOutput, CapabilityError> {
    let result = self
      .server
      .invoke(&invocation.name, invocation.arguments)
      .await;
    match result {
      Ok(result) => Ok(ToolOutput::success(result.text())),
      Err(source) => Err(CapabilityError::External {
        tool: invocation.name,
        source,
      }),
    }
  }
}
