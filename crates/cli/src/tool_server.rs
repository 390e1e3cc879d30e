//! `cumulus tool-server`: the weather tool over MCP on stdio.

use std::collections::BTreeMap;

use rmcp::{
    ErrorData, ServerHandler, ServiceExt,
    model::{
        CallToolRequestParams, CallToolResult, Content, Implementation, JsonObject,
        ListToolsResult, PaginatedRequestParams, ServerCapabilities, ServerInfo, Tool,
    },
    service::{RequestContext, RoleServer},
    transport::stdio,
};
use runtime::{Invocation, ToolHost, ToolResult, WeatherTool};
use serde_json::Value;
use tracing::info;

use crate::config::Config;
use crate::error::{Error, Result};

pub const SERVER_NAME: &str = "cumulus-weather";

/// Serves a [`WeatherTool`] to MCP clients. Results go back as the
/// rendered report text; failures are reported in-band with `isError`.
pub struct WeatherHandler {
    tool: WeatherTool,
}

impl WeatherHandler {
    pub fn new(tool: WeatherTool) -> Self {
        Self { tool }
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.tool.specs().iter().map(Tool::from).collect()
    }

    pub async fn call(&self, name: &str, arguments: JsonObject) -> CallToolResult {
        let invocation = Invocation {
            name: name.to_string(),
            arguments: string_arguments(arguments),
        };
        match self.tool.execute(&invocation).await {
            Ok(payload) => CallToolResult::success(vec![Content::text(
                ToolResult::success(payload).render(),
            )]),
            Err(e) => CallToolResult::error(vec![Content::text(e.to_string())]),
        }
    }
}

impl ServerHandler for WeatherHandler {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Implementation::from_build_env()
            },
            instructions: Some("Current weather for a 'City, CC' location.".to_string()),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(self.tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, ErrorData> {
        Ok(self
            .call(&request.name, request.arguments.unwrap_or_default())
            .await)
    }
}

/// Flatten JSON arguments to text; strings are taken as-is.
fn string_arguments(arguments: JsonObject) -> BTreeMap<String, String> {
    arguments
        .into_iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| match v {
            Value::String(s) => (k, s),
            other => (k, other.to_string()),
        })
        .collect()
}

/// Serve until stdin closes.
pub async fn run(config: &Config) -> Result<()> {
    let client = weather::Client::new(config.weather_client()?);
    let handler = WeatherHandler::new(WeatherTool::new(client));

    let service = handler
        .serve(stdio())
        .await
        .map_err(|e| Error::ToolServe(e.to_string()))?;
    info!("tool server ready on stdio");

    service
        .waiting()
        .await
        .map_err(|e| Error::ToolServe(e.to_string()))?;
    info!("tool server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use runtime::{McpToolHost, ToolError};
    use serde_json::json;
    use std::time::Duration;

    fn handler() -> WeatherHandler {
        WeatherHandler::new(WeatherTool::new(weather::Client::new(weather::Config {
            api_key: "k".into(),
            geo_url: "http://127.0.0.1:9/geo".into(),
            current_url: "http://127.0.0.1:9/weather".into(),
            timeout: Duration::from_millis(200),
        })))
    }

    fn object(value: Value) -> JsonObject {
        match value {
            Value::Object(map) => map,
            _ => JsonObject::new(),
        }
    }

    fn text(result: &CallToolResult) -> &str {
        result.content[0].as_text().map(|t| t.text.as_str()).unwrap()
    }

    #[test]
    fn lists_the_weather_tool() {
        let tools = handler().tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "weather");
        assert_eq!(tools[0].input_schema["required"], json!(["location"]));

        let info = handler().get_info();
        assert_eq!(info.server_info.name, SERVER_NAME);
        assert!(info.capabilities.tools.is_some());
    }

    #[test]
    fn arguments_are_flattened_to_text() {
        let args = string_arguments(object(json!({"location": "Paris, FR", "days": 2, "x": null})));
        assert_eq!(args.len(), 2);
        assert_eq!(args["location"], "Paris, FR");
        assert_eq!(args["days"], "2");
    }

    #[tokio::test]
    async fn failures_are_reported_in_band() {
        let result = handler()
            .call("weather", object(json!({"location": "Paris"})))
            .await;
        assert_eq!(result.is_error, Some(true));
        assert_eq!(
            text(&result),
            "Location must be 'City, CC' (e.g. 'San Juan, PR')"
        );

        let unknown = handler().call("stocks", JsonObject::new()).await;
        assert_eq!(unknown.is_error, Some(true));
        assert_eq!(text(&unknown), "unknown tool: stocks");
    }

    #[tokio::test]
    async fn mcp_host_talks_to_the_handler() {
        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        let server = tokio::spawn(async move { handler().serve(tokio::io::split(server_io)).await });
        let client = ().serve(tokio::io::split(client_io)).await.unwrap();
        let _server = server.await.unwrap().unwrap();

        let host = McpToolHost::connect(client).await.unwrap();
        assert_eq!(host.specs().len(), 1);
        assert_eq!(host.specs()[0].name, "weather");

        let missing = Invocation::new("weather");
        assert_eq!(
            host.execute(&missing).await,
            Err(ToolError::Remote(
                "Missing required argument: location".into()
            ))
        );

        let malformed = Invocation::new("weather").with_argument("location", "Paris");
        assert_eq!(
            host.execute(&malformed).await,
            Err(ToolError::Remote(
                "Location must be 'City, CC' (e.g. 'San Juan, PR')".into()
            ))
        );
    }
}
