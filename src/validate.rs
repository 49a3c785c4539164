//! Validation of aggregated OpenAPI documents.
//!
//! The document must be an OpenAPI 3.0 document that `openapiv3` accepts, and
//! on top of the structural check:
//! - every operation declares at least one response;
//! - every `$ref` is local and resolves within the document;
//! - every `{name}` in a path template is declared as a path parameter.

use std::collections::HashSet;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::openapi::Document;

static METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Validate an aggregated document.
pub fn document(document: &Document) -> Result<()> {
    value(&serde_json::to_value(document)?)
}

/// Validate an OpenAPI document given as JSON.
pub fn value(doc: &Value) -> Result<()> {
    check_version(doc)?;

    serde_json::from_value::<openapiv3::OpenAPI>(doc.clone())
        .map_err(|e| invalid(format!("not a valid OpenAPI 3.0 document: {e}")))?;

    check_responses(doc)?;
    check_refs(doc, doc, &mut Vec::new())?;
    check_path_parameters(doc)?;

    Ok(())
}

fn invalid(message: String) -> Error {
    Error::SpecValidation(message)
}

fn check_version(doc: &Value) -> Result<()> {
    let version = doc
        .get("openapi")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("missing 'openapi' version".into()))?;

    let mut parts = version.split('.');
    let supported = parts.next() == Some("3")
        && parts.next() == Some("0")
        && parts
            .next()
            .is_some_and(|patch| !patch.is_empty() && patch.chars().all(|c| c.is_ascii_digit()))
        && parts.next().is_none();

    if !supported {
        return Err(invalid(format!(
            "unsupported OpenAPI version '{version}', expected 3.0.x"
        )));
    }
    Ok(())
}

/// Iterate `(path, method, operation)` over every operation in `doc`.
fn operations(doc: &Value) -> impl Iterator<Item = (&str, &str, &Value)> {
    doc.get("paths")
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|paths| paths.iter())
        .filter_map(|(path, item)| item.as_object().map(|item| (path, item)))
        .flat_map(|(path, item)| {
            METHODS.iter().filter_map(move |method| {
                item.get(*method)
                    .map(|operation| (path.as_str(), *method, operation))
            })
        })
}

fn check_responses(doc: &Value) -> Result<()> {
    for (path, method, operation) in operations(doc) {
        let empty = operation
            .get("responses")
            .and_then(Value::as_object)
            .is_none_or(|responses| responses.is_empty());
        if empty {
            return Err(invalid(format!(
                "paths.{path}.{method}: operation declares no responses"
            )));
        }
    }
    Ok(())
}

fn check_refs<'a>(root: &Value, node: &'a Value, at: &mut Vec<&'a str>) -> Result<()> {
    match node {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get("$ref") {
                let location = at.join(".");
                match reference.strip_prefix('#') {
                    Some(pointer) if root.pointer(pointer).is_some() => {}
                    Some(_) => {
                        return Err(invalid(format!(
                            "{location}: unresolved reference '{reference}'"
                        )));
                    }
                    None => {
                        return Err(invalid(format!(
                            "{location}: external reference '{reference}' is not supported"
                        )));
                    }
                }
            }
            for (key, child) in map {
                at.push(key);
                check_refs(root, child, at)?;
                at.pop();
            }
        }
        Value::Array(items) => {
            for child in items {
                check_refs(root, child, at)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Names of the `{name}` segments of a path template.
fn template_names(path: &str) -> Vec<&str> {
    path.split('{')
        .skip(1)
        .filter_map(|rest| rest.split_once('}').map(|(name, _)| name))
        .collect()
}

fn declared_path_parameters<'a>(doc: &'a Value, parameters: Option<&'a Value>) -> HashSet<&'a str> {
    parameters
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|parameter| match parameter.get("$ref").and_then(Value::as_str) {
            Some(reference) => reference
                .strip_prefix('#')
                .and_then(|pointer| doc.pointer(pointer)),
            None => Some(parameter),
        })
        .filter(|parameter| parameter.get("in").and_then(Value::as_str) == Some("path"))
        .filter_map(|parameter| parameter.get("name").and_then(Value::as_str))
        .collect()
}

fn check_path_parameters(doc: &Value) -> Result<()> {
    for (path, method, operation) in operations(doc) {
        let names = template_names(path);
        if names.is_empty() {
            continue;
        }

        let item_level = doc["paths"][path].get("parameters");
        let mut declared = declared_path_parameters(doc, item_level);
        declared.extend(declared_path_parameters(doc, operation.get("parameters")));

        if let Some(missing) = names.iter().find(|name| !declared.contains(*name)) {
            return Err(invalid(format!(
                "paths.{path}.{method}: path parameter '{missing}' is not declared"
            )));
        }
    }
    Ok(())
}
