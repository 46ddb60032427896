//! Strict JSON-schema normalization.
//!
//! Model providers running in strict structured-output mode accept only a
//! constrained schema subset: objects forbid undeclared properties, every
//! declared property is required, and indirection (`$ref` with siblings,
//! single-element `allOf`) is flattened. This transform converts a regular
//! schema into that subset, failing loudly on anything that cannot be
//! expressed losslessly. Conversion failures are setup errors surfaced to
//! the caller configuring the agent, never runtime failures.

use serde_json::{Map, Value, json};
use windlass_core::error::ToolError;

/// Convert `schema` to the strict subset.
///
/// An empty (or missing) schema becomes the canonical empty strict object.
pub fn ensure_strict_json_schema(schema: &Value) -> Result<Value, ToolError> {
    match schema {
        Value::Object(map) if map.is_empty() => Ok(empty_strict_object()),
        Value::Null => Ok(empty_strict_object()),
        _ => ensure(schema, &[], schema),
    }
}

fn empty_strict_object() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {},
        "required": [],
    })
}

fn ensure(schema: &Value, path: &[&str], root: &Value) -> Result<Value, ToolError> {
    let Value::Object(obj) = schema else {
        return Err(ToolError::Schema(format!(
            "expected an object at path {:?}, got {schema}",
            path.join("/")
        )));
    };
    let mut out = obj.clone();

    for def_key in ["$defs", "definitions"] {
        if let Some(Value::Object(defs)) = out.get(def_key).cloned() {
            let mut new_defs = Map::new();
            for (name, def) in &defs {
                let sub_path = [path, &[def_key, name.as_str()]].concat();
                new_defs.insert(name.clone(), ensure(def, &sub_path, root)?);
            }
            out.insert(def_key.to_string(), Value::Object(new_defs));
        }
    }

    if out.get("type").and_then(Value::as_str) == Some("object") {
        match out.get("additionalProperties") {
            None => {
                out.insert("additionalProperties".into(), Value::Bool(false));
            }
            Some(Value::Bool(false)) => {}
            Some(value) if *value == json!({"not": {}}) => {}
            Some(_) => {
                return Err(ToolError::Schema(
                    "additionalProperties must be false for object types in strict schemas"
                        .to_string(),
                ));
            }
        }
    }

    if let Some(Value::Object(props)) = out.get("properties").cloned() {
        let mut keys: Vec<String> = props.keys().cloned().collect();
        keys.sort();
        out.insert("required".into(), json!(keys));

        let mut new_props = Map::new();
        for key in &keys {
            let sub_path = [path, &["properties", key.as_str()]].concat();
            new_props.insert(key.clone(), ensure(&props[key], &sub_path, root)?);
        }
        out.insert("properties".into(), Value::Object(new_props));
    }

    if let Some(items) = out.get("items").cloned() {
        if items.is_object() {
            let sub_path = [path, &["items"]].concat();
            out.insert("items".into(), ensure(&items, &sub_path, root)?);
        }
    }

    if let Some(Value::Array(any_of)) = out.get("anyOf").cloned() {
        let mut new_any_of = Vec::with_capacity(any_of.len());
        for (i, variant) in any_of.iter().enumerate() {
            let index = i.to_string();
            let sub_path = [path, &["anyOf", index.as_str()]].concat();
            new_any_of.push(ensure(variant, &sub_path, root)?);
        }
        out.insert("anyOf".into(), Value::Array(new_any_of));
    }

    if let Some(Value::Array(all_of)) = out.get("allOf").cloned() {
        if all_of.len() == 1 {
            let sub_path = [path, &["allOf", "0"]].concat();
            let merged = ensure(&all_of[0], &sub_path, root)?;
            out.remove("allOf");
            if let Value::Object(merged) = merged {
                for (key, value) in merged {
                    out.insert(key, value);
                }
            }
        } else {
            let mut new_all_of = Vec::with_capacity(all_of.len());
            for (i, variant) in all_of.iter().enumerate() {
                let index = i.to_string();
                let sub_path = [path, &["allOf", index.as_str()]].concat();
                new_all_of.push(ensure(variant, &sub_path, root)?);
            }
            out.insert("allOf".into(), Value::Array(new_all_of));
        }
    }

    // A null default carries no information in strict mode.
    if out.get("default") == Some(&Value::Null) {
        out.remove("default");
    }

    if let Some(ref_value) = out.get("$ref").cloned() {
        if out.len() > 1 {
            let Some(ref_str) = ref_value.as_str() else {
                return Err(ToolError::Schema(format!(
                    "non-string $ref at path {:?}: got {ref_value}",
                    path.join("/")
                )));
            };
            let resolved = resolve_ref(root, ref_str)?;
            out.remove("$ref");
            for (key, value) in resolved {
                out.entry(key).or_insert(value);
            }
            return ensure(&Value::Object(out), path, root);
        }
    }

    Ok(Value::Object(out))
}

fn resolve_ref(root: &Value, reference: &str) -> Result<Map<String, Value>, ToolError> {
    let Some(pointer) = reference.strip_prefix("#/") else {
        return Err(ToolError::Schema(format!(
            "unexpected $ref format: expected `#/` prefix in $ref value {reference:?}"
        )));
    };

    let mut resolved = root;
    for key in pointer.split('/') {
        let Some(entry) = resolved.get(key) else {
            return Err(ToolError::Schema(format!(
                "missing key {key:?} while resolving $ref {reference:?}"
            )));
        };
        if !entry.is_object() {
            return Err(ToolError::Schema(format!(
                "non-object entry at key {key:?} while resolving $ref {reference:?}"
            )));
        }
        resolved = entry;
    }

    match resolved {
        Value::Object(map) => Ok(map.clone()),
        _ => unreachable!("checked is_object above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_schema_becomes_canonical_strict_object() {
        let out = ensure_strict_json_schema(&json!({})).unwrap();
        assert_eq!(out["type"], "object");
        assert_eq!(out["additionalProperties"], false);
        assert_eq!(out["properties"], json!({}));
        assert_eq!(out["required"], json!([]));
    }

    #[test]
    fn object_gains_additional_properties_false_and_sorted_required() {
        let schema = json!({
            "type": "object",
            "properties": {
                "b": {"type": "string"},
                "a": {"type": "number"}
            }
        });
        let out = ensure_strict_json_schema(&schema).unwrap();
        assert_eq!(out["additionalProperties"], false);
        assert_eq!(out["required"], json!(["a", "b"]));
    }

    #[test]
    fn non_false_additional_properties_is_an_error() {
        let schema = json!({
            "type": "object",
            "additionalProperties": {"type": "string"},
            "properties": {}
        });
        let err = ensure_strict_json_schema(&schema).unwrap_err();
        assert!(matches!(err, ToolError::Schema(_)));
        assert!(err.to_string().contains("additionalProperties"));
    }

    #[test]
    fn nested_objects_are_normalized_recursively() {
        let schema = json!({
            "type": "object",
            "properties": {
                "inner": {
                    "type": "object",
                    "properties": {"x": {"type": "integer"}}
                }
            }
        });
        let out = ensure_strict_json_schema(&schema).unwrap();
        let inner = &out["properties"]["inner"];
        assert_eq!(inner["additionalProperties"], false);
        assert_eq!(inner["required"], json!(["x"]));
    }

    #[test]
    fn array_items_are_normalized() {
        let schema = json!({
            "type": "array",
            "items": {
                "type": "object",
                "properties": {"name": {"type": "string"}}
            }
        });
        let out = ensure_strict_json_schema(&schema).unwrap();
        assert_eq!(out["items"]["additionalProperties"], false);
        assert_eq!(out["items"]["required"], json!(["name"]));
    }

    #[test]
    fn any_of_variants_are_normalized() {
        let schema = json!({
            "anyOf": [
                {"type": "object", "properties": {"a": {"type": "string"}}},
                {"type": "string"}
            ]
        });
        let out = ensure_strict_json_schema(&schema).unwrap();
        assert_eq!(out["anyOf"][0]["additionalProperties"], false);
        assert_eq!(out["anyOf"][1], json!({"type": "string"}));
    }

    #[test]
    fn single_element_all_of_is_flattened() {
        let schema = json!({
            "allOf": [
                {"type": "object", "properties": {"a": {"type": "string"}}}
            ]
        });
        let out = ensure_strict_json_schema(&schema).unwrap();
        assert!(out.get("allOf").is_none());
        assert_eq!(out["type"], "object");
        assert_eq!(out["required"], json!(["a"]));
    }

    #[test]
    fn null_default_is_stripped() {
        let schema = json!({
            "type": "object",
            "properties": {
                "a": {"type": "string", "default": null}
            }
        });
        let out = ensure_strict_json_schema(&schema).unwrap();
        assert!(out["properties"]["a"].get("default").is_none());
    }

    #[test]
    fn ref_with_siblings_is_expanded() {
        let schema = json!({
            "type": "object",
            "properties": {
                "point": {
                    "$ref": "#/$defs/point",
                    "description": "a 2D point"
                }
            },
            "$defs": {
                "point": {
                    "type": "object",
                    "properties": {"x": {"type": "number"}, "y": {"type": "number"}}
                }
            }
        });
        let out = ensure_strict_json_schema(&schema).unwrap();
        let point = &out["properties"]["point"];
        assert!(point.get("$ref").is_none());
        assert_eq!(point["description"], "a 2D point");
        assert_eq!(point["type"], "object");
        assert_eq!(point["required"], json!(["x", "y"]));
    }

    #[test]
    fn bare_ref_is_left_alone() {
        let schema = json!({
            "type": "object",
            "properties": {
                "point": {"$ref": "#/$defs/point"}
            },
            "$defs": {
                "point": {"type": "object", "properties": {}}
            }
        });
        let out = ensure_strict_json_schema(&schema).unwrap();
        assert_eq!(out["properties"]["point"]["$ref"], "#/$defs/point");
    }

    #[test]
    fn external_ref_is_an_error() {
        let schema = json!({
            "type": "object",
            "properties": {
                "bad": {"$ref": "http://example.com/schema.json", "description": "x"}
            }
        });
        let err = ensure_strict_json_schema(&schema).unwrap_err();
        assert!(err.to_string().contains("$ref"));
    }

    #[test]
    fn dangling_ref_is_an_error() {
        let schema = json!({
            "type": "object",
            "properties": {
                "bad": {"$ref": "#/$defs/missing", "description": "x"}
            }
        });
        let err = ensure_strict_json_schema(&schema).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }
}
