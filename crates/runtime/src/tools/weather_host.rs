//! In-process weather tool.

use serde_json::{Value, json};
use weather::{Client, Location};

use super::{Invocation, ToolError, ToolHost, ToolSpec};

pub const WEATHER_TOOL: &str = "weather";
pub const LOCATION_ARGUMENT: &str = "location";

/// Tool host exposing the single `weather` tool.
#[derive(Debug, Clone)]
pub struct WeatherTool {
    client: Client,
    specs: Vec<ToolSpec>,
}

impl WeatherTool {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            specs: vec![weather_spec()],
        }
    }
}

/// Description and input schema of the weather tool.
pub fn weather_spec() -> ToolSpec {
    ToolSpec {
        name: WEATHER_TOOL.to_string(),
        description: "Get current weather for a location given as 'City, CC', where CC is \
                      an ISO-3166 country code or a US state code (e.g. 'San Juan, PR')."
            .to_string(),
        schema: json!({
            "type": "object",
            "properties": {
                LOCATION_ARGUMENT: {
                    "type": "string",
                    "description": "City and two-letter country or state code, e.g. 'Paris, FR'"
                }
            },
            "required": [LOCATION_ARGUMENT]
        }),
    }
}

impl ToolHost for WeatherTool {
    fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    async fn execute(&self, invocation: &Invocation) -> Result<Value, ToolError> {
        if invocation.name != WEATHER_TOOL {
            return Err(ToolError::UnknownTool(invocation.name.clone()));
        }

        let raw = invocation.arguments.get(LOCATION_ARGUMENT).ok_or_else(|| {
            ToolError::InvalidArguments(format!("Missing required argument: {LOCATION_ARGUMENT}"))
        })?;
        let location =
            Location::parse(raw).map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let report = self.client.current(&location).await?;
        serde_json::to_value(report).map_err(|e| ToolError::Execution(e.to_string()))
    }

    async fn is_ready(&self) -> bool {
        !self.client.config().api_key.is_empty()
    }
}
