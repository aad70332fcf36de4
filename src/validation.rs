//! Stimulus input validation against the JSON schemas in the capability card

use serde_json::Value;

/// Validate input against a JSON schema; the error names the offending field.
pub fn validate_input(input: &Value, schema: &Value) -> Result<(), String> {
    if !input.is_object() {
        return Err(format!("Input must be an object, got {}", input));
    }

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for field_name in required {
            let field_str = field_name
                .as_str()
                .ok_or_else(|| "Invalid schema: required field not a string".to_string())?;

            if input.get(field_str).map_or(true, Value::is_null) {
                return Err(format!("Missing required field: {}", field_str));
            }
        }
    }

    if let (Some(properties), Some(input_obj)) = (
        schema.get("properties").and_then(|p| p.as_object()),
        input.as_object(),
    ) {
        for (key, value) in input_obj {
            if let Some(prop_schema) = properties.get(key) {
                validate_property(key, value, prop_schema)?;
            }
        }
    }

    Ok(())
}

fn validate_property(key: &str, value: &Value, schema: &Value) -> Result<(), String> {
    if let Some(expected_type) = schema.get("type").and_then(|t| t.as_str()) {
        let valid = match expected_type {
            "string" => value.is_string(),
            "integer" => value.is_i64() || value.is_u64(),
            "number" => value.is_number(),
            "boolean" => value.is_boolean(),
            "array" => value.is_array(),
            "object" => value.is_object(),
            "null" => value.is_null(),
            _ => true, // Unknown types pass validation
        };

        if !valid {
            return Err(format!(
                "Type mismatch for {}: expected {}, got {}",
                key, expected_type, value
            ));
        }
    }

    if let Some(allowed) = schema.get("enum").and_then(|e| e.as_array()) {
        if !allowed.contains(value) {
            return Err(format!("Invalid value for {}: {}", key, value));
        }
    }

    Ok(())
}
