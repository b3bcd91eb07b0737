//! Recursive JSON-Schema argument validation with default-fill (§4.D).
//!
//! This walks an `inputSchema`-shaped JSON value against the arguments it
//! describes, filling in declared `default`s for missing properties and
//! failing on missing properties that are `required` with no default. It
//! is a generic tree walker, not schema-library reflection, since the
//! default-fill behaviour (mutating the argument tree in place) has no
//! equivalent in `jsonschema`'s validation-only API.

use serde_json::Value;

use crate::error::ConduitError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Dotted/indexed paths (`field`, `field.child`, `field[0]`) that were
    /// filled from a schema `default`.
    pub defaults_applied: Vec<String>,
}

/// Validates `args` against `schema.properties`/`schema.required`,
/// mutating `args` in place to fill in defaults. A missing schema, or a
/// schema with empty/absent `properties`, is a no-op success.
pub fn validate_and_fill_defaults(schema: &Value, args: &mut Value) -> Result<ValidationOutcome, ConduitError> {
    let mut outcome = ValidationOutcome::default();
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(outcome);
    };
    if properties.is_empty() {
        return Ok(outcome);
    }
    if !args.is_object() {
        *args = Value::Object(Default::default());
    }
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    walk_object(properties, args, &required, "", &mut outcome)?;
    Ok(outcome)
}

fn walk_object(
    properties: &serde_json::Map<String, Value>,
    args: &mut Value,
    required: &[&str],
    path_prefix: &str,
    outcome: &mut ValidationOutcome,
) -> Result<(), ConduitError> {
    let obj = args
        .as_object_mut()
        .expect("caller ensures args is an object before recursing");

    for (key, prop_schema) in properties {
        let path = if path_prefix.is_empty() {
            key.clone()
        } else {
            format!("{path_prefix}.{key}")
        };

        if !obj.contains_key(key) {
            if let Some(default) = prop_schema.get("default") {
                obj.insert(key.clone(), default.clone());
                outcome.defaults_applied.push(path.clone());
            } else if required.contains(&key.as_str()) {
                return Err(ConduitError::MissingArgument(path));
            } else {
                continue;
            }
        }

        let child_required: Vec<&str> = prop_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let value = obj.get_mut(key).expect("just inserted or already present");
        match prop_schema.get("type").and_then(Value::as_str) {
            Some("object") => {
                if let Some(child_props) = prop_schema.get("properties").and_then(Value::as_object) {
                    if !value.is_object() {
                        *value = Value::Object(Default::default());
                    }
                    walk_object(child_props, value, &child_required, &path, outcome)?;
                }
            }
            Some("array") => {
                if let Some(item_props) = prop_schema
                    .get("items")
                    .and_then(|i| i.get("properties"))
                    .and_then(Value::as_object)
                {
                    let item_required: Vec<&str> = prop_schema
                        .get("items")
                        .and_then(|i| i.get("required"))
                        .and_then(Value::as_array)
                        .map(|r| r.iter().filter_map(Value::as_str).collect())
                        .unwrap_or_default();
                    if let Some(arr) = value.as_array_mut() {
                        for (i, item) in arr.iter_mut().enumerate() {
                            if !item.is_object() {
                                *item = Value::Object(Default::default());
                            }
                            let item_path = format!("{path}[{i}]");
                            walk_object(item_props, item, &item_required, &item_path, outcome)?;
                        }
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Compiles `schema` and validates `instance` against it, returning the
/// first error message on failure. Used where full JSON-Schema semantics
/// (beyond required/default) matter, e.g. type/format checks on
/// already-filled arguments.
pub fn validate_json_schema(schema: &Value, instance: &Value) -> Result<(), ConduitError> {
    let validator = jsonschema::validator_for(schema)
        .map_err(|e| ConduitError::InvalidArgument(format!("invalid schema: {e}")))?;
    if let Err(first_error) = validator.validate(instance) {
        return Err(ConduitError::InvalidArgument(first_error.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn no_schema_is_a_noop() {
        let schema = json!({});
        let mut args = json!({"msg": "hi"});
        let outcome = validate_and_fill_defaults(&schema, &mut args).unwrap();
        assert!(outcome.defaults_applied.is_empty());
        assert_eq!(args, json!({"msg": "hi"}));
    }

    #[test]
    fn missing_required_fails() {
        let schema = json!({
            "properties": {"msg": {"type": "string"}},
            "required": ["msg"]
        });
        let mut args = json!({});
        let err = validate_and_fill_defaults(&schema, &mut args).unwrap_err();
        assert!(matches!(err, ConduitError::MissingArgument(p) if p == "msg"));
    }

    #[test]
    fn missing_with_default_is_filled() {
        let schema = json!({
            "properties": {"count": {"type": "integer", "default": 10}}
        });
        let mut args = json!({});
        let outcome = validate_and_fill_defaults(&schema, &mut args).unwrap();
        assert_eq!(outcome.defaults_applied, vec!["count".to_string()]);
        assert_eq!(args["count"], json!(10));
    }

    #[test]
    fn defaults_fill_at_any_depth() {
        let schema = json!({
            "properties": {
                "opts": {
                    "type": "object",
                    "properties": {
                        "retries": {"type": "integer", "default": 3}
                    }
                },
                "items": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {"weight": {"type": "number", "default": 1.0}}
                    }
                }
            }
        });
        let mut args = json!({"opts": {}, "items": [{}, {"weight": 2.0}]});
        let outcome = validate_and_fill_defaults(&schema, &mut args).unwrap();
        assert_eq!(args["opts"]["retries"], json!(3));
        assert_eq!(args["items"][0]["weight"], json!(1.0));
        assert_eq!(args["items"][1]["weight"], json!(2.0));
        assert!(outcome.defaults_applied.contains(&"opts.retries".to_string()));
        assert!(outcome.defaults_applied.contains(&"items[0].weight".to_string()));
    }
}
