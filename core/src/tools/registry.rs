use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use mcpilot_mcp_client::{ToolCatalog, ToolDescriptor, ToolServer};

use crate::tools::context::{CapabilityError, ToolInvocation, ToolOutput};
use crate::tools::handlers::{McpHandler, WEB_SEARCH_TOOL, WebSearch, WebSearchHandler, web_search_spec};
use crate::tools::spec::{ToolHandlerType, ToolSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinTool {
  WebSearch,
}

impl BuiltinTool {
  pub fn name(self) -> &'static str {
    match self {
      BuiltinTool::WebSearch => WEB_SEARCH_TOOL,
    }
  }

  fn spec(self) -> ToolSpec {
    match self {
      BuiltinTool::WebSearch => web_search_spec(),
    }
  }
}

/// A capability the reasoning service may call, whichever side serves it.
#[derive(Debug, Clone, PartialEq)]
pub enum CallableTool {
  External(ToolDescriptor),
  Builtin(BuiltinTool),
}

impl CallableTool {
  pub fn name(&self) -> &str {
    match self {
      CallableTool::External(descriptor) => &descriptor.name,
      CallableTool::Builtin(builtin) => builtin.name(),
    }
  }

  pub fn spec(&self) -> ToolSpec {
    match self {
      CallableTool::External(descriptor) => ToolSpec::new(
        descriptor.name.clone(),
        descriptor.description.clone(),
        descriptor.input_schema.clone(),
        ToolHandlerType::Mcp,
      ),
      CallableTool::Builtin(builtin) => builtin.spec(),
    }
  }

  pub fn handler_type(&self) -> ToolHandlerType {
    match self {
      CallableTool::External(_) => ToolHandlerType::Mcp,
      CallableTool::Builtin(_) => ToolHandlerType::Builtin,
    }
  }
}

/// Uniform view over catalog operations plus the built-in search.
///
/// Built once per session; the callable list never changes afterwards.
pub struct ToolRegistry {
  callables: Vec<CallableTool>,
  index: HashMap<String, usize>,
  mcp: McpHandler,
  web_search: Option<WebSearchHandler>,
}

impl ToolRegistry {
  pub fn new(
    catalog: &ToolCatalog,
    server: Arc<dyn ToolServer>,
    search: Option<Arc<dyn WebSearch>>,
  ) -> Self {
    let mut callables: Vec<CallableTool> = catalog
      .descriptors()
      .iter()
      .cloned()
      .map(CallableTool::External)
      .collect();

    let web_search = match search {
      Some(_) if catalog.lookup(WEB_SEARCH_TOOL).is_some() => {
        warn!("tool server already provides `{WEB_SEARCH_TOOL}`; built-in search not offered");
        None
      }
      Some(backend) => {
        callables.push(CallableTool::Builtin(BuiltinTool::WebSearch));
        Some(WebSearchHandler::new(backend))
      }
      None => None,
    };

    let index = callables
      .iter()
      .enumerate()
      .map(|(i, tool)| (tool.name().to_string(), i))
      .collect();

    Self {
      callables,
      index,
      mcp: McpHandler::new(server),
      web_search,
    }
  }

  pub fn list_callables(&self) -> &[CallableTool] {
    &self.callables
  }

  pub fn get(&self, name: &str) -> Option<&CallableTool> {
    self.index.get(name).map(|&i| &self.callables[i])
  }

  pub fn list_specs(&self) -> Vec<ToolSpec> {
    self.callables.iter().map(CallableTool::spec).collect()
  }

  pub fn model_tools(&self) -> Vec<crate::model::Tool> {
    self
      .list_specs()
      .iter()
      .map(ToolSpec::to_model_tool)
      .collect()
  }

  pub async fn invoke(
    &self,
    tool: &CallableTool,
    arguments: serde_json::Value,
  ) -> Result<ToolOutput, CapabilityError> {
    let invocation = ToolInvocation::new(tool.name(), arguments);
    info!(
      tool = tool.name(),
      provenance = ?tool.handler_type(),
      "invoking tool"
    );

    match tool {
      CallableTool::External(_) => self.mcp.handle(invocation).await,
      CallableTool::Builtin(BuiltinTool::WebSearch) => match &self.web_search {
        Some(handler) => handler.handle(invocation).await,
        None => Err(CapabilityError::NotFound(invocation.name)),
      },
    }
  }

  pub async fn invoke_by_name(
    &self,
    name: &str,
    arguments: serde_json::Value,
  ) -> Result<ToolOutput, CapabilityError> {
    let tool = self
      .get(name)
      .ok_or_else(|| CapabilityError::NotFound(name.to_string()))?;
    self.invoke(tool, arguments).await
  }
}
