//! MCP-backed tool host.

use std::collections::HashMap;
use std::time::Duration;

use rmcp::{
    ServiceExt,
    model::{CallToolRequestParams, CallToolResult},
    service::{RoleClient, RunningService},
    transport::{ConfigureCommandExt, TokioChildProcess},
};
use serde_json::{Map, Value, json};
use tokio::process::Command;
use tracing::{debug, info};

use super::{Invocation, McpError, ToolError, ToolHost, ToolSpec};

/// Bound on a single `tools/call` round trip.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(30);

const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

/// How to start a tool server process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolServerCommand {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

/// Tool host backed by an MCP server.
pub struct McpToolHost {
    service: RunningService<RoleClient, ()>,
    specs: Vec<ToolSpec>,
    timeout: Duration,
}

impl McpToolHost {
    /// Spawn the server as a child process and connect to it over its stdio.
    pub async fn spawn(server: &ToolServerCommand) -> Result<Self, McpError> {
        let transport = TokioChildProcess::new(Command::new(&server.command).configure(|cmd| {
            cmd.args(&server.args).envs(&server.env);
        }))?;

        let service = ()
            .serve(transport)
            .await
            .map_err(|e| McpError::Handshake(e.to_string()))?;
        info!(command = %server.command, "tool server connected");

        Self::connect(service).await
    }

    /// Wrap an initialized client session and cache the server's tool specs.
    pub async fn connect(service: RunningService<RoleClient, ()>) -> Result<Self, McpError> {
        let tools = service
            .list_tools(Default::default())
            .await
            .map_err(|e| McpError::Request(e.to_string()))?
            .tools;
        let specs: Vec<ToolSpec> = tools.into_iter().map(ToolSpec::from).collect();
        debug!(tools = ?specs.iter().map(|s| &s.name).collect::<Vec<_>>(), "tool specs cached");

        Ok(Self {
            service,
            specs,
            timeout: CALL_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Close the session and stop the server.
    pub async fn shutdown(self) -> Result<(), McpError> {
        self.service
            .cancel()
            .await
            .map(|_| ())
            .map_err(|e| McpError::Request(e.to_string()))
    }
}

/// Text blocks of a result, joined by newlines.
fn joined_text(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|c| c.as_text().map(|t| t.text.as_str()))
        .collect::<Vec<_>>()
        .join("\n")
}

impl ToolHost for McpToolHost {
    fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    async fn execute(&self, invocation: &Invocation) -> Result<Value, ToolError> {
        let arguments: Map<String, Value> = invocation
            .arguments
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        let params = CallToolRequestParams {
            meta: None,
            task: None,
            name: invocation.name.clone().into(),
            arguments: Some(arguments),
        };

        let result = match tokio::time::timeout(self.timeout, self.service.call_tool(params)).await {
            Err(_) => return Err(ToolError::Timeout),
            Ok(Err(e)) => return Err(ToolError::Execution(e.to_string())),
            Ok(Ok(result)) => result,
        };

        let text = joined_text(&result);
        if result.is_error.unwrap_or(false) {
            Err(ToolError::Remote(text))
        } else {
            Ok(json!({ "result": text }))
        }
    }

    async fn is_ready(&self) -> bool {
        let listed = tokio::time::timeout(HEALTH_TIMEOUT, self.service.list_tools(Default::default()));
        matches!(listed.await, Ok(Ok(_)))
    }
}
