//! Tool host selected by `tools.transport`.

use runtime::{Invocation, McpToolHost, ToolError, ToolHost, ToolSpec, WeatherTool};
use serde_json::Value;
use tracing::info;

use crate::config::{Config, Transport};
use crate::error;

/// Either the in-process weather tool or a tool server child process.
pub enum ToolBackend {
    Local(WeatherTool),
    Remote(McpToolHost),
}

impl ToolBackend {
    /// Build the host named by the configuration.
    pub async fn from_config(config: &Config) -> error::Result<Self> {
        match config.tools.transport {
            Transport::Local => {
                let client = weather::Client::new(config.weather_client()?);
                info!("tools run in-process");
                Ok(Self::Local(WeatherTool::new(client)))
            }
            Transport::Mcp => {
                let server = config.tool_server();
                info!(command = %server.command, args = ?server.args, "starting tool server");
                Ok(Self::Remote(McpToolHost::spawn(&server).await?))
            }
        }
    }
}

impl ToolHost for ToolBackend {
    fn specs(&self) -> &[ToolSpec] {
        match self {
            Self::Local(host) => host.specs(),
            Self::Remote(host) => host.specs(),
        }
    }

    async fn execute(&self, invocation: &Invocation) -> Result<Value, ToolError> {
        match self {
            Self::Local(host) => host.execute(invocation).await,
            Self::Remote(host) => host.execute(invocation).await,
        }
    }

    async fn is_ready(&self) -> bool {
        match self {
            Self::Local(host) => host.is_ready().await,
            Self::Remote(host) => host.is_ready().await,
        }
    }
}
