//! OpenAPI document aggregation and the endpoint that serves it.

use std::sync::Arc;

use hyper::Method;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config;
use crate::error::{Error, Result};
use crate::operation::Operation;
use crate::registry::Registry;
use crate::response::{self, HttpResponse};
use crate::router::{Context, Router};
use crate::validate;

/// An aggregated OpenAPI document.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub openapi: String,
    pub info: Info,
    /// Canonical path → lower-cased method → operation.
    pub paths: IndexMap<String, IndexMap<String, Operation>>,
    #[serde(skip_serializing_if = "Components::is_empty")]
    pub components: Components,
}

/// Top-level API info for the OpenAPI document.
#[derive(Debug, Clone, Serialize)]
pub struct Info {
    pub title: String,
    pub version: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Components {
    pub schemas: IndexMap<String, Value>,
}

impl Components {
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl Document {
    /// An empty document scaffold.
    pub fn new(spec: &config::Spec) -> Self {
        Self {
            openapi: spec.openapi_version.clone(),
            info: Info {
                title: spec.title.clone(),
                version: spec.version.clone(),
                description: spec.description.clone(),
            },
            paths: IndexMap::new(),
            components: Components::default(),
        }
    }

    /// Add an operation under `path` and `method`.
    ///
    /// Operations are merged per path per method: a second operation for the
    /// same pair replaces the first, other methods on the path are kept.
    pub fn add_operation(&mut self, path: &str, method: &str, operation: &Operation) -> Result<()> {
        for (name, schema) in operation.component_schemas() {
            self.merge_schema(name, schema)?;
        }

        self.paths
            .entry(path.to_string())
            .or_default()
            .insert(method.to_lowercase(), operation.clone());
        Ok(())
    }

    /// Identical schemas dedupe; different schemas under one name conflict.
    fn merge_schema(&mut self, name: &str, schema: &Value) -> Result<()> {
        match self.components.schemas.get(name) {
            Some(existing) if existing != schema => Err(Error::SchemaConflict {
                name: name.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.components
                    .schemas
                    .insert(name.to_string(), schema.clone());
                Ok(())
            }
        }
    }

    /// The operation for a path and method, if documented.
    pub fn operation(&self, path: &str, method: &str) -> Option<&Operation> {
        self.paths.get(path)?.get(&method.to_lowercase())
    }
}

/// Build, validate and publish the OpenAPI document for `router`.
///
/// Registers a GET route at `spec.path` serving the document, then walks every
/// route registered so far. Routes whose handler has an entry in `registry`
/// and whose path resolved are added under their canonical path. The document
/// is validated before it is stored in the router's state; on failure nothing
/// is stored and the spec route answers with an internal error. A spec path
/// the router cannot match is a configuration error.
pub fn setup(router: &mut Router, registry: &Registry, spec: &config::Spec) -> Result<Arc<Document>> {
    let mut document = Document::new(spec);

    router.get(&spec.path, serve);
    let reachable = router.routes().any(|route| {
        *route.method() == Method::GET && route.path() == spec.path && route.resource().is_some()
    });
    if !reachable {
        return Err(Error::Config(format!(
            "spec path '{}' conflicts with an existing route",
            spec.path
        )));
    }

    for route in router.routes() {
        let Some(resource) = route.resource() else {
            continue;
        };
        let Some(operation) = registry.operation(route.handler().id()) else {
            continue;
        };

        debug!(
            "Documenting {} {}",
            route.method(),
            resource.canonical()
        );
        document.add_operation(resource.canonical(), route.method().as_str(), operation)?;
    }

    validate::document(&document)?;

    let document = Arc::new(document);
    router.insert_state(Arc::clone(&document));

    info!(
        "OpenAPI {} document with {} paths served at {}",
        document.openapi,
        document.paths.len(),
        spec.path
    );

    Ok(document)
}

/// Serve the document stored by [`setup`].
async fn serve(ctx: Context) -> Result<HttpResponse> {
    let document = ctx
        .state::<Arc<Document>>()
        .ok_or(Error::MissingState("OpenAPI document"))?;
    response::ok(document.as_ref())
}
