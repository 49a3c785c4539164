//! The document endpoint as seen over the wire.

use routedoc::{
    Config, Describe, JsonResponse, Method, Parameter, Registry, RequestBody, Router, response,
    schema, server,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{get, json_body, local_config, raw_request};

#[derive(Serialize, Deserialize, JsonSchema)]
struct Pet {
    id: u64,
    name: String,
    tag: Option<String>,
}

#[derive(Serialize, JsonSchema)]
#[allow(dead_code)]
struct Problem {
    message: String,
}

/// A small pet API with three documented handlers and one undocumented one.
fn pet_store() -> (Router, Registry) {
    let mut registry = Registry::new();
    let mut router = Router::new();

    let list = registry
        .register(
            Describe::new("List pets")
                .parameter(Parameter::query("limit", schema::of::<u32>()))
                .response(JsonResponse::of::<Vec<Pet>>("All pets")),
            |_ctx| async move {
                response::ok(&vec![Pet {
                    id: 1,
                    name: "Rex".to_string(),
                    tag: None,
                }])
            },
        )
        .unwrap();

    let fetch = registry
        .register(
            Describe::new("Fetch a pet")
                .parameter(Parameter::path("id", schema::of::<u64>()))
                .response(JsonResponse::of::<Pet>("The pet"))
                .response(JsonResponse::of::<Problem>("No such pet").status(404)),
            |ctx| async move {
                let id: u64 = ctx
                    .require_param("id")?
                    .parse()
                    .map_err(|_| routedoc::Error::BadRequest("id must be a number".into()))?;
                response::ok(&Pet {
                    id,
                    name: "Rex".to_string(),
                    tag: Some("dog".to_string()),
                })
            },
        )
        .unwrap();

    let create = registry
        .register(
            Describe::new("Create a pet")
                .request_body(RequestBody::new("The new pet", schema::of::<Pet>()).required(true))
                .response(JsonResponse::of::<Pet>("Created").status(201)),
            |ctx| async move {
                let pet: Pet = ctx.json()?;
                response::created(&pet)
            },
        )
        .unwrap();

    router.route_handler(Method::GET, "/pets", list);
    router.route_handler(Method::POST, "/pets", create);
    router.route_handler(Method::GET, "/pets/{id}", fetch);
    router.get("/health", |_ctx| async move { response::ok(&"ok") });

    (router, registry)
}

async fn start(config: &Config) -> server::Server {
    let (mut router, registry) = pet_store();
    routedoc::setup(&mut router, &registry, &config.spec).expect("setup failed");
    server::start(config, router.into_handle())
        .await
        .expect("failed to start test server")
}

/// The default path serves the aggregated document as JSON.
#[tokio::test]
async fn spec_endpoint_serves_document() {
    let config = local_config();
    let server = start(&config).await;

    let response = get(server.addr(), "/api/spec.json").await;
    server.shutdown().await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"), "got:\n{response}");
    let (head, doc) = json_body(&response);
    assert!(
        head.to_ascii_lowercase().contains("content-type: application/json"),
        "got:\n{head}"
    );

    assert_eq!(doc["openapi"], "3.0.2");
    assert_eq!(doc["info"]["title"], "Pet Store");
    assert_eq!(doc["info"]["version"], "1.0.0");
    assert_eq!(doc["info"]["description"], "Pets and their owners");

    let paths = doc["paths"].as_object().unwrap();
    let mut keys: Vec<&str> = paths.keys().map(String::as_str).collect();
    keys.sort();
    assert_eq!(keys, vec!["/pets", "/pets/{id}"]);
}

/// Operations carry what their handlers declared.
#[tokio::test]
async fn spec_endpoint_describes_operations() {
    let config = local_config();
    let server = start(&config).await;

    let (_, doc) = json_body(&get(server.addr(), "/api/spec.json").await);
    server.shutdown().await.unwrap();

    let list = &doc["paths"]["/pets"]["get"];
    assert_eq!(list["description"], "List pets");
    assert_eq!(list["parameters"][0]["in"], "query");
    assert_eq!(list["parameters"][0]["name"], "limit");
    assert_eq!(list["parameters"][0]["required"], false);

    let create = &doc["paths"]["/pets"]["post"];
    assert_eq!(create["requestBody"]["required"], true);
    let body_schema = &create["requestBody"]["content"]["application/json"]["schema"];
    assert_eq!(body_schema["title"], "Pet");
    assert_eq!(body_schema["type"], "object");
    assert_eq!(create["responses"]["201"]["description"], "Created");

    let fetch = &doc["paths"]["/pets/{id}"]["get"];
    assert_eq!(fetch["parameters"][0]["in"], "path");
    assert_eq!(fetch["parameters"][0]["required"], true);
    assert_eq!(fetch["responses"]["200"]["description"], "The pet");
    assert_eq!(fetch["responses"]["404"]["description"], "No such pet");

    // Pet is nested in the list response, so it is hoisted into components
    let list_items = &list["responses"]["200"]["content"]["application/json"]["schema"]["items"];
    assert_eq!(list_items["$ref"], "#/components/schemas/Pet");
    let schemas = doc["components"]["schemas"].as_object().unwrap();
    assert_eq!(
        schemas["Pet"]["properties"]["tag"],
        serde_json::json!({ "type": "string", "nullable": true })
    );
}

/// The spec path and OpenAPI version follow configuration.
#[tokio::test]
async fn spec_endpoint_honors_configured_path() {
    let mut config = local_config();
    config.spec.path = "/docs/openapi.json".to_string();
    config.spec.openapi_version = "3.0.3".to_string();
    let server = start(&config).await;

    let moved = get(server.addr(), "/docs/openapi.json").await;
    let default = get(server.addr(), "/api/spec.json").await;
    server.shutdown().await.unwrap();

    assert!(moved.starts_with("HTTP/1.1 200"), "got:\n{moved}");
    assert_eq!(json_body(&moved).1["openapi"], "3.0.3");
    assert!(default.starts_with("HTTP/1.1 404"), "got:\n{default}");
}

/// Documented handlers answer requests exactly as they would undocumented.
#[tokio::test]
async fn documented_handlers_still_serve() {
    let config = local_config();
    let server = start(&config).await;
    let addr = server.addr();

    let fetched = get(addr, "/pets/7").await;
    let body = r#"{"id":3,"name":"Tom","tag":null}"#;
    let created = raw_request(
        addr,
        format!(
            "POST /pets HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
        .as_bytes(),
    )
    .await;
    let health = get(addr, "/health").await;
    server.shutdown().await.unwrap();

    assert!(fetched.starts_with("HTTP/1.1 200"), "got:\n{fetched}");
    assert_eq!(json_body(&fetched).1["id"], 7);
    assert!(created.starts_with("HTTP/1.1 201"), "got:\n{created}");
    assert_eq!(json_body(&created).1["name"], "Tom");
    assert!(health.starts_with("HTTP/1.1 200"), "got:\n{health}");
}

/// Only GET is routed at the spec path.
#[tokio::test]
async fn spec_endpoint_rejects_other_methods() {
    let config = local_config();
    let server = start(&config).await;

    let response = raw_request(
        server.addr(),
        b"POST /api/spec.json HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
    )
    .await;
    server.shutdown().await.unwrap();

    assert!(response.starts_with("HTTP/1.1 405"), "got:\n{response}");
}
