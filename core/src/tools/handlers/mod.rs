pub mod mcp;
pub mod web_search;

pub use mcp::McpHandler;
pub use web_search::{
  DuckDuckGoSearch, SearchError, WEB_SEARCH_TOOL, WebSearch, WebSearchHandler, web_search_spec,
};
