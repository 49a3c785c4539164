//! HTTP routing with matchit.
//!
//! Provides the route table that documented handlers are registered on. Every
//! route keeps its method, its path template and the handler bound to it, in
//! registration order, so the table can be walked once at startup.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use hyper::http::Extensions;
use hyper::{Method, Request};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::Result;
use crate::response::{self, HttpResponse};

/// Boxed future for async handlers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Handler context passed to route handlers.
pub struct Context {
    /// The HTTP method.
    pub method: Method,
    /// The request URI.
    pub uri: hyper::Uri,
    /// The request headers.
    pub headers: hyper::http::HeaderMap,
    /// Route parameters (e.g., {id} from path).
    pub params: HashMap<String, String>,
    /// The request body, pre-read as bytes.
    pub body: Bytes,
    /// Application-wide state shared by every request.
    pub state: Arc<Extensions>,
}

impl Context {
    /// Create a context with no headers, params, body or state.
    pub fn new(method: Method, uri: hyper::Uri) -> Self {
        Self {
            method,
            uri,
            headers: hyper::http::HeaderMap::new(),
            params: HashMap::new(),
            body: Bytes::new(),
            state: Arc::new(Extensions::new()),
        }
    }

    /// Parse the request body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if self.body.is_empty() {
            serde_json::from_value(serde_json::Value::Null)
                .map_err(|e| crate::Error::BadRequest(format!("Invalid request body: {e}")))
        } else {
            serde_json::from_slice(&self.body)
                .map_err(|e| crate::Error::BadRequest(format!("Invalid request body: {e}")))
        }
    }

    /// Get a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get a route parameter by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(|s| s.as_str())
    }

    /// Get a required route parameter, returning BadRequest if missing.
    pub fn require_param(&self, name: &str) -> Result<&str> {
        self.param(name)
            .ok_or_else(|| crate::Error::BadRequest(format!("Missing parameter: {name}")))
    }

    /// Get a value from application state.
    pub fn state<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.state.get::<T>()
    }
}

/// Identity of a handler, stable across clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        HandlerId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

type HandlerFn = dyn Fn(Context) -> BoxFuture<'static, Result<HttpResponse>> + Send + Sync;

/// A route handler.
///
/// Takes a Context and returns a future resolving to a Response. Clones share
/// the same [`HandlerId`].
#[derive(Clone)]
pub struct Handler {
    id: HandlerId,
    call: Arc<HandlerFn>,
}

impl Handler {
    /// Wrap an async function as a handler with a fresh identity.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        let call: Arc<HandlerFn> =
            Arc::new(move |ctx| -> BoxFuture<'static, Result<HttpResponse>> { Box::pin(f(ctx)) });
        Self {
            id: HandlerId::next(),
            call,
        }
    }

    /// This handler's identity.
    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// Invoke the handler.
    pub fn call(&self, ctx: Context) -> BoxFuture<'static, Result<HttpResponse>> {
        (self.call)(ctx)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").field("id", &self.id).finish()
    }
}

/// The matched path of a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    canonical: String,
}

impl Resource {
    fn from_template(template: &str) -> Self {
        // matchit catch-alls are written `{*name}`; OpenAPI only knows `{name}`
        Self {
            canonical: template.replace("{*", "{"),
        }
    }

    /// The templated path used as the OpenAPI `paths` key, e.g. `/users/{id}`.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

/// A registered route.
#[derive(Debug, Clone)]
pub struct Route {
    method: Method,
    path: String,
    resource: Option<Resource>,
    handler: Handler,
}

impl Route {
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The path template as registered.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The resource this route resolved to, or `None` when the path could
    /// not be added to the matcher and the route is unreachable.
    pub fn resource(&self) -> Option<&Resource> {
        self.resource.as_ref()
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }
}

/// Method-specific handlers sharing one path template.
struct RouteEntry {
    handlers: HashMap<Method, Handler>,
}

/// HTTP router for registering and dispatching requests.
pub struct Router {
    matcher: matchit::Router<usize>,
    templates: HashMap<String, usize>,
    entries: Vec<RouteEntry>,
    routes: Vec<Route>,
    state: Extensions,
}

impl Router {
    /// Create a new router.
    pub fn new() -> Self {
        Self {
            matcher: matchit::Router::new(),
            templates: HashMap::new(),
            entries: Vec::new(),
            routes: Vec::new(),
            state: Extensions::new(),
        }
    }

    /// Register a handler for a method and path.
    ///
    /// # Example
    /// ```ignore
    /// router.route(Method::GET, "/api/v1/users", |ctx| async move {
    ///     response::ok(&["user1", "user2"])
    /// });
    /// ```
    pub fn route<F, Fut>(&mut self, method: Method, path: &str, handler: F)
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        self.route_handler(method, path, Handler::new(handler));
    }

    /// Register an existing [`Handler`], keeping its identity.
    ///
    /// This is how handlers returned by
    /// [`Registry::register`](crate::Registry::register) are routed.
    /// Registering the same method and path twice replaces the earlier
    /// handler. A path the matcher rejects (e.g. it conflicts with an existing
    /// template) is kept in the route list without a resource.
    pub fn route_handler(&mut self, method: Method, path: &str, handler: Handler) {
        let entry_idx = match self.templates.get(path) {
            Some(idx) => Some(*idx),
            None => {
                let idx = self.entries.len();
                match self.matcher.insert(path, idx) {
                    Ok(()) => {
                        self.entries.push(RouteEntry {
                            handlers: HashMap::new(),
                        });
                        self.templates.insert(path.to_string(), idx);
                        Some(idx)
                    }
                    Err(e) => {
                        warn!("Route {} {} is unreachable: {}", method, path, e);
                        None
                    }
                }
            }
        };

        let resource = entry_idx.map(|idx| {
            let replaced = self.entries[idx]
                .handlers
                .insert(method.clone(), handler.clone());
            if replaced.is_some() {
                warn!("Route {} {} registered twice, keeping the latest", method, path);
                self.routes
                    .retain(|r| !(r.method == method && r.path == path));
            }
            Resource::from_template(path)
        });

        self.routes.push(Route {
            method,
            path: path.to_string(),
            resource,
            handler,
        });
    }

    /// Convenience method for GET requests.
    pub fn get<F, Fut>(&mut self, path: &str, handler: F)
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        self.route(Method::GET, path, handler);
    }

    /// Convenience method for POST requests.
    pub fn post<F, Fut>(&mut self, path: &str, handler: F)
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        self.route(Method::POST, path, handler);
    }

    /// Convenience method for PUT requests.
    pub fn put<F, Fut>(&mut self, path: &str, handler: F)
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        self.route(Method::PUT, path, handler);
    }

    /// Convenience method for DELETE requests.
    pub fn delete<F, Fut>(&mut self, path: &str, handler: F)
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        self.route(Method::DELETE, path, handler);
    }

    /// Convenience method for PATCH requests.
    pub fn patch<F, Fut>(&mut self, path: &str, handler: F)
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        self.route(Method::PATCH, path, handler);
    }

    /// Registered routes in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    /// Store a value in application state, keyed by its type.
    pub fn insert_state<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.state.insert(value)
    }

    /// Get a value from application state.
    pub fn state<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.state.get::<T>()
    }

    /// Convert to a thread-safe handle for use in request handling.
    pub fn into_handle(self) -> Arc<RouterHandle> {
        Arc::new(RouterHandle {
            matcher: self.matcher,
            entries: self.entries,
            state: Arc::new(self.state),
        })
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe router handle for use in request handling.
pub struct RouterHandle {
    matcher: matchit::Router<usize>,
    entries: Vec<RouteEntry>,
    state: Arc<Extensions>,
}

/// Result of matching a request to a route.
pub enum RouteMatch<'a> {
    /// Route matched with handler.
    Matched {
        handler: &'a Handler,
        params: HashMap<String, String>,
    },
    /// Path matched but method not allowed.
    MethodNotAllowed,
    /// Path not found.
    NotFound,
}

impl RouterHandle {
    /// Match a request to a route.
    pub fn match_route(&self, method: &Method, path: &str) -> RouteMatch<'_> {
        match self.matcher.at(path) {
            Ok(matched) => {
                let entry = &self.entries[*matched.value];

                let params: HashMap<String, String> = matched
                    .params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();

                match entry.handlers.get(method) {
                    Some(handler) => RouteMatch::Matched { handler, params },
                    None => RouteMatch::MethodNotAllowed,
                }
            }
            Err(_) => RouteMatch::NotFound,
        }
    }

    /// Application state frozen from the router.
    pub fn state(&self) -> &Arc<Extensions> {
        &self.state
    }

    /// Route a fully-read request to its handler and produce the response.
    pub async fn dispatch(&self, request: Request<Bytes>) -> HttpResponse {
        let (parts, body) = request.into_parts();

        match self.match_route(&parts.method, parts.uri.path()) {
            RouteMatch::Matched { handler, params } => {
                let ctx = Context {
                    method: parts.method,
                    uri: parts.uri,
                    headers: parts.headers,
                    params,
                    body,
                    state: Arc::clone(&self.state),
                };

                match handler.call(ctx).await {
                    Ok(response) => response,
                    Err(e) => e.into_response(),
                }
            }
            RouteMatch::MethodNotAllowed => response::method_not_allowed(),
            RouteMatch::NotFound => response::not_found("Not found"),
        }
    }
}
