//! Tool hosts and dispatch.

mod dispatch;
mod errors;
mod host;
mod mcp_host;
mod types;
mod weather_host;

pub use dispatch::ToolDispatcher;
pub use errors::{McpError, ToolError};
pub use host::ToolHost;
pub use mcp_host::{McpToolHost, ToolServerCommand};
pub use types::{Invocation, ToolFailure, ToolResult, ToolSpec};
pub use weather_host::{LOCATION_ARGUMENT, WEATHER_TOOL, WeatherTool, weather_spec};
