// mcpilot MCP Client
// Lifecycle and protocol bridge for stdio tool servers

pub mod catalog;
pub mod channel;
pub mod error;
pub mod protocol;
pub mod session;

pub use catalog::{ToolCatalog, ToolSummary};
pub use error::{McpClientError, Result};
pub use protocol::{CallToolResult, ContentBlock, Implementation, ToolDescriptor};
pub use session::{ServerLaunch, SessionOptions, ToolServer, ToolServerSession};
