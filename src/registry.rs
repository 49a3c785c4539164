//! Side table of operation metadata keyed by handler identity.
//!
//! Registering does not alter a handler's behavior: the [`Handler`] handed
//! back runs the same function, and the registry remembers what was declared
//! about it under the handler's identity. Routing stays with
//! [`Router`](crate::Router).
//!
//! # Example
//!
//! ```ignore
//! let mut docs = Registry::new();
//! let ping = docs.register(
//!     Describe::new("Liveness check").response(JsonResponse::new("ok", schema::empty())),
//!     |_ctx| async move { response::ok(&"pong") },
//! )?;
//! router.route_handler(Method::GET, "/ping", ping);
//! ```

use std::collections::HashMap;
use std::future::Future;

use crate::Result;
use crate::operation::{Describe, Operation};
use crate::response::HttpResponse;
use crate::router::{Context, Handler, HandlerId};

/// Operation metadata for documented handlers.
#[derive(Debug, Default)]
pub struct Registry {
    operations: HashMap<HandlerId, Operation>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap `handler` with a fresh identity and record `describe` for it.
    pub fn register<F, Fut>(&mut self, describe: Describe, handler: F) -> Result<Handler>
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        self.register_handler(describe, Handler::new(handler))
    }

    /// Record `describe` for an existing handler and hand it back.
    ///
    /// A handler that is already registered keeps its operation and has the
    /// new declaration layered on top (see [`Operation::apply`]).
    pub fn register_handler(&mut self, describe: Describe, handler: Handler) -> Result<Handler> {
        match self.operations.get_mut(&handler.id()) {
            Some(operation) => {
                // Work on a copy so a malformed declaration leaves the entry untouched
                let mut merged = operation.clone();
                merged.apply(&describe)?;
                *operation = merged;
            }
            None => {
                let operation = Operation::build(&describe)?;
                self.operations.insert(handler.id(), operation);
            }
        }

        Ok(handler)
    }

    /// The operation recorded for a handler, if any.
    pub fn operation(&self, id: HandlerId) -> Option<&Operation> {
        self.operations.get(&id)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
