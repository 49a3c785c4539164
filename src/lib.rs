//! Routedoc - OpenAPI documents built from the routes that serve them.
//!
//! Handlers declare what they accept and return next to where they are
//! defined; at startup the declarations of every routed handler are collected
//! into one OpenAPI 3.0 document, validated, and served as JSON.
//!
//! - **Operation**: Declarations (`Describe`) and the operation objects built from them
//! - **Registry**: Side table of operations keyed by handler identity
//! - **OpenAPI**: Aggregation, validation and the document endpoint
//! - **Router**: HTTP routing with path parameters and typed app state
//! - **Server**: Hyper-based HTTP server
//! - **Config**: Layered configuration (file → env → CLI)
//!
//! # Example
//!
//! ```ignore
//! use routedoc::{ConfigLoader, Describe, JsonResponse, Method, Registry, Router, response};
//!
//! #[tokio::main]
//! async fn main() -> routedoc::Result<()> {
//!     let config = ConfigLoader::new("MYAPP").load(None, None, None, None)?;
//!
//!     let mut registry = Registry::new();
//!     let mut router = Router::new();
//!
//!     let ping = registry.register(
//!         Describe::new("Liveness check").response(JsonResponse::of::<String>("pong")),
//!         |_ctx| async move { response::ok(&"pong") },
//!     )?;
//!     router.route_handler(Method::GET, "/ping", ping);
//!
//!     routedoc::setup(&mut router, &registry, &config.spec)?;
//!     routedoc::server::run(&config, router.into_handle()).await
//! }
//! ```

pub mod config;
pub mod error;
pub mod openapi;
pub mod operation;
pub mod registry;
pub mod response;
pub mod router;
pub mod schema;
pub mod server;
pub mod validate;

// Re-export main types at crate root
pub use config::{Config, ConfigLoader};
pub use error::{Error, Result};
pub use openapi::{Document, setup};
pub use operation::{
    Describe, JsonResponse, Operation, Parameter, ParameterIn, RequestBody, Response,
};
pub use registry::Registry;
pub use router::{Context, Handler, HandlerId, Router};

// Re-export commonly used dependencies for convenience
pub use hyper::Method;
pub use serde_json::json;
