//! A tiny documented API.
//!
//! ```text
//! PING_SPEC_TITLE="Ping" PING_SPEC_VERSION=1.0.0 cargo run --example ping -- [config.toml]
//! curl localhost:8080/api/spec.json
//! ```

use routedoc::{
    ConfigLoader, Describe, JsonResponse, Method, Parameter, Registry, Router, response, schema,
    server,
};
use schemars::JsonSchema;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Serialize, JsonSchema)]
struct Pong {
    message: String,
    echo: Option<String>,
}

#[tokio::main]
async fn main() -> routedoc::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let config = ConfigLoader::new("PING").load(config_path.as_deref(), None, None, None)?;

    let mut registry = Registry::new();
    let mut router = Router::new();

    let ping = registry.register(
        Describe::new("Liveness check")
            .parameter(Parameter::query("echo", schema::of::<String>()))
            .response(JsonResponse::of::<Pong>("The service is up"))
            .doc(
                "---
                summary: Ping the service
                tags: [health]
                ",
            ),
        |ctx| async move {
            let echo = ctx
                .uri
                .query()
                .and_then(|q| q.split('&').find_map(|kv| kv.strip_prefix("echo=")))
                .map(str::to_string);
            response::ok(&Pong {
                message: "pong".to_string(),
                echo,
            })
        },
    )?;
    router.route_handler(Method::GET, "/ping", ping);

    routedoc::setup(&mut router, &registry, &config.spec)?;
    server::run(&config, router.into_handle()).await
}
