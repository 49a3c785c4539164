//! Failures surfaced by `setup` and how the served endpoint reflects them.

use std::sync::Arc;

use routedoc::{
    Describe, Document, Error, JsonResponse, Method, Parameter, Registry, Router, response, schema,
    server,
};

use super::{get, json_body, local_config};

fn ok() -> JsonResponse {
    JsonResponse::new("ok", schema::empty())
}

/// An operation without responses fails validation; nothing is stored and the
/// endpoint answers 500 without leaking the cause.
#[tokio::test]
async fn invalid_document_is_not_served() {
    let config = local_config();
    let mut registry = Registry::new();
    let mut router = Router::new();

    let silent = registry
        .register(Describe::new("Declares nothing"), |_ctx| async move {
            response::ok(&"x")
        })
        .unwrap();
    router.route_handler(Method::GET, "/silent", silent);

    let err = routedoc::setup(&mut router, &registry, &config.spec).unwrap_err();
    assert!(matches!(err, Error::SpecValidation(_)), "got {err:?}");
    assert!(err.to_string().contains("operation declares no responses"));
    assert!(router.state::<Arc<Document>>().is_none());

    let server = server::start(&config, router.into_handle()).await.unwrap();
    let response = get(server.addr(), "/api/spec.json").await;
    server.shutdown().await.unwrap();

    assert!(response.starts_with("HTTP/1.1 500"), "got:\n{response}");
    let (_, body) = json_body(&response);
    assert_eq!(body["error"], "Internal server error");
}

/// A templated path whose parameter is not declared fails validation.
#[test]
fn undeclared_path_parameter_fails() {
    let config = local_config();
    let mut registry = Registry::new();
    let mut router = Router::new();

    let fetch = registry
        .register(Describe::new("Fetch").response(ok()), |_ctx| async move {
            response::ok(&"x")
        })
        .unwrap();
    router.route_handler(Method::GET, "/things/{id}", fetch);

    let err = routedoc::setup(&mut router, &registry, &config.spec).unwrap_err();
    assert!(err.to_string().contains("path parameter 'id' is not declared"));
}

/// Catch-all segments are documented under their plain `{name}` form.
#[test]
fn catch_all_paths_are_canonicalized() {
    let config = local_config();
    let mut registry = Registry::new();
    let mut router = Router::new();

    let files = registry
        .register(
            Describe::new("Serve a file")
                .parameter(Parameter::path("rest", schema::of::<String>()))
                .response(ok()),
            |ctx| async move { response::ok(&ctx.param("rest")) },
        )
        .unwrap();
    router.route_handler(Method::GET, "/files/{*rest}", files);

    let document = routedoc::setup(&mut router, &registry, &config.spec).unwrap();
    assert!(document.operation("/files/{rest}", "get").is_some());
    assert!(!document.paths.contains_key("/files/{*rest}"));
}

/// Two different schemas published under one component name are rejected.
#[test]
fn conflicting_component_schemas_fail() {
    mod a {
        #[derive(schemars::JsonSchema)]
        #[allow(dead_code)]
        pub struct Item {
            pub name: String,
        }
    }
    mod b {
        #[derive(schemars::JsonSchema)]
        #[allow(dead_code)]
        pub struct Item {
            pub count: u32,
        }
    }

    let config = local_config();
    let mut registry = Registry::new();
    let mut router = Router::new();

    let names = registry
        .register(
            Describe::new("Names").response(JsonResponse::of::<Vec<a::Item>>("names")),
            |_ctx| async move { response::ok(&"a") },
        )
        .unwrap();
    let counts = registry
        .register(
            Describe::new("Counts").response(JsonResponse::of::<Vec<b::Item>>("counts")),
            |_ctx| async move { response::ok(&"b") },
        )
        .unwrap();
    router.route_handler(Method::GET, "/names", names);
    router.route_handler(Method::GET, "/counts", counts);

    let err = routedoc::setup(&mut router, &registry, &config.spec).unwrap_err();
    assert!(matches!(err, Error::SchemaConflict { ref name } if name == "Item"), "got {err:?}");
}

/// Operations declared in docstring YAML reach the document.
#[test]
fn doc_yaml_reaches_document() {
    let config = local_config();
    let mut registry = Registry::new();
    let mut router = Router::new();

    let ping = registry
        .register(
            Describe::new("Ping").response(ok()).doc(
                "Liveness check.

                ---
                summary: Ping the service
                tags: [health]
                ",
            ),
            |_ctx| async move { response::ok(&"pong") },
        )
        .unwrap();
    router.route_handler(Method::GET, "/ping", ping);

    let document = routedoc::setup(&mut router, &registry, &config.spec).unwrap();
    let op = document.operation("/ping", "get").unwrap();
    assert_eq!(op.get("summary").unwrap(), "Ping the service");
    assert_eq!(op.get("tags").unwrap()[0], "health");
    assert_eq!(op.description(), Some("Ping"));
}
