//! Tool-related types.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use rmcp::model::Tool;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use weather::WeatherReport;

/// A tool call recognized in model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub name: String,
    pub arguments: BTreeMap<String, String>,
}

impl Invocation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: BTreeMap::new(),
        }
    }

    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }
}

/// Outcome of one tool call: the provider payload, or an error message.
///
/// Serializes to the payload fields on success and `{"error": ...}` on
/// failure, never both. Only an object whose sole field is a string `error`
/// reads back as a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResult {
    Failure(ToolFailure),
    Success(Map<String, Value>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolFailure {
    pub error: String,
}

impl ToolResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure(ToolFailure {
            error: error.into(),
        })
    }

    /// Wrap a payload. Non-object values are placed under `result`.
    pub fn success(payload: Value) -> Self {
        match payload {
            Value::Object(map) => Self::Success(map),
            other => {
                let mut map = Map::new();
                map.insert("result".into(), other);
                Self::Success(map)
            }
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// User-facing text for this result.
    pub fn render(&self) -> String {
        match self {
            Self::Failure(failure) => format!("Error: {}", failure.error),
            Self::Success(map) => {
                let value = Value::Object(map.clone());
                if let Ok(report) = serde_json::from_value::<WeatherReport>(value.clone()) {
                    return report.to_string();
                }
                match map.get("result") {
                    Some(Value::String(text)) => text.clone(),
                    _ => value.to_string(),
                }
            }
        }
    }
}

/// A tool definition exposed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub schema: Value,
}

impl From<Tool> for ToolSpec {
    fn from(tool: Tool) -> Self {
        Self {
            name: tool.name.into_owned(),
            description: tool.description.map(Cow::into_owned).unwrap_or_default(),
            schema: Value::Object(tool.input_schema.as_ref().clone()),
        }
    }
}

impl From<&ToolSpec> for Tool {
    fn from(spec: &ToolSpec) -> Self {
        let schema = match &spec.schema {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        Tool::new(spec.name.clone(), spec.description.clone(), Arc::new(schema))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failure_serializes_as_error_only() {
        let result = ToolResult::failure("Location not found: NoSuchPlace, ZZ");
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"error": "Location not found: NoSuchPlace, ZZ"})
        );
        assert_eq!(result.render(), "Error: Location not found: NoSuchPlace, ZZ");
    }

    #[test]
    fn weather_payload_renders_as_report() {
        let result = ToolResult::success(json!({
            "location": "San Juan, PR",
            "local_time": "2025-07-04 14:27",
            "temperature": 86.3,
            "feels_like": 90.0,
            "humidity": 77.0,
            "wind_speed": 12.0,
            "description": "sunny"
        }));
        assert!(!result.is_failure());
        assert_eq!(
            result.render(),
            "Weather in San Juan, PR (local time 2025-07-04 14:27): 86°F, sunny. \
             Feels like 90°F. Humidity: 77%, Wind: 12 mph"
        );
    }

    #[test]
    fn payload_with_extra_error_field_stays_a_success() {
        let wire = json!({"error": "partial data", "temperature": 50.0});
        let result: ToolResult = serde_json::from_value(wire.clone()).unwrap();
        assert!(!result.is_failure());
        assert_eq!(serde_json::to_value(&result).unwrap(), wire);

        let failure: ToolResult = serde_json::from_value(json!({"error": "boom"})).unwrap();
        assert_eq!(failure, ToolResult::failure("boom"));
    }

    #[test]
    fn specs_convert_to_and_from_mcp_tools() {
        let spec = ToolSpec {
            name: "weather".into(),
            description: "Current weather".into(),
            schema: json!({"type": "object", "required": ["location"]}),
        };
        let tool = Tool::from(&spec);
        assert_eq!(tool.name, "weather");
        assert_eq!(tool.input_schema["required"], json!(["location"]));
        assert_eq!(ToolSpec::from(tool), spec);
    }

    #[test]
    fn other_payloads_render_text_or_json() {
        assert_eq!(ToolResult::success(json!("plain")).render(), "plain");
        assert_eq!(ToolResult::success(json!({"a": 1})).render(), r#"{"a":1}"#);
    }
}
