//! Schema marshalling between schemars and OpenAPI 3.0 documents.
//!
//! Schemas attached to parameters, request bodies and responses are plain
//! [`schemars::Schema`] values. Before they are placed in an operation, any
//! embedded definitions are hoisted out so the aggregated document can keep
//! them under `components/schemas`.

use schemars::generate::SchemaSettings;
use schemars::{JsonSchema, Schema};
use serde_json::{Map, Value, json};

/// Prefix of component schema references in an OpenAPI document.
pub const COMPONENTS_PREFIX: &str = "#/components/schemas/";

/// Generate an OpenAPI 3.0 flavoured schema for `T`.
///
/// Nested types end up as component definitions and are referenced through
/// `#/components/schemas/...`. The OpenAPI 3.0 transforms (such as turning
/// `type: [T, "null"]` into `nullable: true`) apply to those definitions too.
pub fn of<T: JsonSchema>() -> Schema {
    let mut generator = SchemaSettings::openapi3().into_generator();
    let mut schema = generator.root_schema_for::<T>();

    // Definitions embedded by the generator skip the transforms
    let definitions = generator.take_definitions(true);
    if !definitions.is_empty()
        && let Some(root) = schema.as_object_mut()
    {
        let components = root
            .entry("components")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(components) = components.as_object_mut() {
            components.insert("schemas".into(), Value::Object(definitions));
        }
    }

    schema
}

/// A schema accepting any value.
pub fn empty() -> Schema {
    schemars::json_schema!({})
}

/// A schema referencing a named component.
pub fn reference(name: &str) -> Schema {
    schemars::json_schema!({ "$ref": format!("{COMPONENTS_PREFIX}{name}") })
}

/// Split a schema into its inline part and the definitions it carries.
///
/// Definitions may live under `$defs`, `definitions` or `components/schemas`
/// depending on the settings the schema was generated with. References to
/// them are rewritten to point into `components/schemas`.
pub(crate) fn hoist(schema: &Schema) -> (Value, Vec<(String, Value)>) {
    let mut value = match schema.as_value() {
        Value::Bool(true) => json!({}),
        Value::Bool(false) => json!({ "not": {} }),
        other => other.clone(),
    };

    let mut defs = Vec::new();

    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");

        for key in ["$defs", "definitions"] {
            if let Some(Value::Object(found)) = obj.remove(key) {
                collect(found, &mut defs);
            }
        }

        if let Some(Value::Object(components)) = obj.get_mut("components") {
            if let Some(Value::Object(found)) = components.remove("schemas") {
                collect(found, &mut defs);
            }
            if components.is_empty() {
                obj.remove("components");
            }
        }
    }

    (rewrite_refs(value), defs)
}

fn collect(found: Map<String, Value>, defs: &mut Vec<(String, Value)>) {
    for (name, def_schema) in found {
        defs.push((name, rewrite_refs(def_schema)));
    }
}

/// Rewrite `$ref` values from `#/$defs/Foo` or `#/definitions/Foo` to
/// `#/components/schemas/Foo`.
fn rewrite_refs(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| {
                    if k == "$ref"
                        && let Value::String(ref s) = v
                        && let Some(name) = s
                            .strip_prefix("#/$defs/")
                            .or_else(|| s.strip_prefix("#/definitions/"))
                    {
                        return (k, Value::String(format!("{COMPONENTS_PREFIX}{name}")));
                    }
                    let v = if k == "$ref" { v } else { rewrite_refs(v) };
                    (k, v)
                })
                .collect(),
        ),
        Value::Array(arr) => Value::Array(arr.into_iter().map(rewrite_refs).collect()),
        other => other,
    }
}
