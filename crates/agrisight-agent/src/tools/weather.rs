//! Weather tool — simulated current conditions.
//!
//! Readings are fixed: a handful of known cities return canned values and
//! everything else gets a mild default.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use agrisight_core::types::Arguments;

use super::base::{optional_string, require_string, Tool, ToolError};

/// Temperature unit accepted by the tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Unit {
    Celsius,
    Fahrenheit,
}

impl Unit {
    fn parse(s: Option<&str>) -> Result<Self, ToolError> {
        match s.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("celsius") => Ok(Unit::Celsius),
            Some("fahrenheit") => Ok(Unit::Fahrenheit),
            Some(other) => Err(ToolError::InvalidArguments(format!(
                "unit must be 'celsius' or 'fahrenheit', got '{other}'"
            ))),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Unit::Celsius => "celsius",
            Unit::Fahrenheit => "fahrenheit",
        }
    }
}

/// `get_current_weather(location, unit)`.
pub struct WeatherTool;

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_current_weather"
    }

    fn description(&self) -> &str {
        "Get the current weather in a specific location."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "The city and state/country, e.g., 'San Francisco, CA' or 'Jakarta, Indonesia'"
                },
                "unit": {
                    "type": "string",
                    "enum": ["celsius", "fahrenheit"],
                    "description": "The temperature unit (default: celsius)"
                }
            },
            "required": ["location"]
        })
    }

    async fn execute(&self, args: Arguments) -> Result<Value, ToolError> {
        let location = require_string(&args, "location")?;
        let unit = Unit::parse(optional_string(&args, "unit").as_deref())?;

        info!(location = %location, unit = unit.as_str(), "simulating weather lookup");

        let lower = location.to_lowercase();
        let (temperature, condition) = if lower.contains("jakarta") {
            (if unit == Unit::Celsius { 30 } else { 86 }, "Hot and humid")
        } else if lower.contains("dallas") {
            (if unit == Unit::Fahrenheit { 85 } else { 29 }, "Partly cloudy")
        } else {
            (if unit == Unit::Celsius { 20 } else { 68 }, "Pleasant")
        };

        Ok(json!({
            "location": location,
            "temperature": temperature,
            "unit": unit.as_str(),
            "condition": condition,
            "forecast": "Stable for the next few hours."
        }))
    }
}
