//! HTTP server implementation using hyper.
//!
//! The server reads each request body in full (up to [`MAX_BODY_SIZE`]) and
//! hands the request to [`RouterHandle::dispatch`].

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http_body_util::{BodyExt, Limited};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::Error;
use crate::config::Config;
use crate::response::{self, HttpResponse};
use crate::router::RouterHandle;

/// Maximum request body size in bytes (1 MB).
pub const MAX_BODY_SIZE: usize = 1_048_576;

/// Maximum number of concurrent connections.
const MAX_CONNECTIONS: usize = 128;

/// Timeout for reading request headers.
const HEADER_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Handle to a running server instance.
pub struct Server {
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<crate::Result<()>>,
}

impl Server {
    /// The address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shut down the accept loop and wait for it to finish.
    pub async fn shutdown(self) -> crate::Result<()> {
        let _ = self.shutdown_tx.send(());
        join(self.task).await
    }
}

/// Wait for the accept loop, surfacing a panic or cancellation as an error.
async fn join(task: JoinHandle<crate::Result<()>>) -> crate::Result<()> {
    task.await
        .map_err(|e| Error::Internal(format!("Server task failed: {e}")))?
}

fn declared_length(request: &Request<Incoming>) -> Option<usize> {
    request
        .headers()
        .get(hyper::header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

async fn handle_request(
    request: Request<Incoming>,
    router: Arc<RouterHandle>,
) -> Result<HttpResponse, Infallible> {
    if declared_length(&request).is_some_and(|len| len > MAX_BODY_SIZE) {
        return Ok(response::payload_too_large());
    }

    let (parts, body) = request.into_parts();

    // Chunked bodies carry no length up front
    let body = match Limited::new(body, MAX_BODY_SIZE).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            debug!("Rejecting {} {}: {}", parts.method, parts.uri.path(), e);
            return Ok(response::payload_too_large());
        }
    };

    Ok(router.dispatch(Request::from_parts(parts, body)).await)
}

fn connection_builder() -> auto::Builder<TokioExecutor> {
    let mut builder = auto::Builder::new(TokioExecutor::new());
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(HEADER_READ_TIMEOUT);
    builder
}

/// Bind, start accepting connections, and return a handle.
///
/// Binding port 0 picks a free port; [`Server::addr`] reports it.
pub async fn start(config: &Config, router: Arc<RouterHandle>) -> crate::Result<Server> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    let addr = listener.local_addr()?;

    info!("Server listening on http://{}", addr);

    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
    let semaphore = Arc::new(Semaphore::new(MAX_CONNECTIONS));

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                result = listener.accept() => {
                    let (stream, remote_addr) = result?;
                    let io = TokioIo::new(stream);

                    let Ok(permit) = Arc::clone(&semaphore).try_acquire_owned() else {
                        warn!("Connection limit reached, rejecting {}", remote_addr);
                        tokio::spawn(async move {
                            let service = service_fn(|_req: Request<Incoming>| async {
                                Ok::<_, Infallible>(response::error(
                                    StatusCode::SERVICE_UNAVAILABLE,
                                    "Service unavailable",
                                ))
                            });
                            let _ = connection_builder().serve_connection(io, service).await;
                        });
                        continue;
                    };

                    let router = Arc::clone(&router);
                    tokio::spawn(async move {
                        let service = service_fn(move |req| handle_request(req, Arc::clone(&router)));

                        if let Err(e) = connection_builder().serve_connection(io, service).await {
                            error!("Error serving connection from {}: {}", remote_addr, e);
                        }

                        drop(permit);
                    });
                }
                _ = &mut shutdown_rx => {
                    info!("Server on {} shutting down", addr);
                    break;
                }
            }
        }

        Ok(())
    });

    Ok(Server {
        addr,
        shutdown_tx,
        task,
    })
}

/// Run the HTTP server until the accept loop fails.
pub async fn run(config: &Config, router: Arc<RouterHandle>) -> crate::Result<()> {
    let server = start(config, router).await?;
    join(server.task).await
}
