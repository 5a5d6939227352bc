pub mod context;
pub mod handlers;
pub mod registry;
pub mod spec;

use std::sync::Arc;

use mcpilot_config::SearchConfig;
use mcpilot_mcp_client::{ToolCatalog, ToolServer};

pub use context::{CapabilityError, ToolInvocation, ToolOutput};
pub use handlers::{DuckDuckGoSearch, SearchError, WEB_SEARCH_TOOL, WebSearch};
pub use registry::{BuiltinTool, CallableTool, ToolRegistry};
pub use spec::{ToolHandlerType, ToolSpec};

/// Build the session's tool registry from the discovered catalog.
pub fn build_default_tools(
  catalog: &ToolCatalog,
  server: Arc<dyn ToolServer>,
  search: &SearchConfig,
) -> Arc<ToolRegistry> {
  let backend: Option<Arc<dyn WebSearch>> = if search.enabled {
    Some(Arc::new(DuckDuckGoSearch::new(search)))
  } else {
    None
  };
  Arc::new(ToolRegistry::new(catalog, server, backend))
}
