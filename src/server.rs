//! Hosting the app on hyper.
//!
//! The dispatcher is synchronous, so each request's lifecycle runs on
//! tokio's blocking pool while connections are driven on the async runtime:
//!
//! ```text
//! accept ─► hyper connection ─► collect body ─► spawn_blocking(app.run) ─► into_http
//! ```
//!
//! # Shutdown
//!
//! On SIGTERM or Ctrl-C ([`serve`](Server::serve)), or when the supplied
//! future resolves ([`serve_with_shutdown`](Server::serve_with_shutdown)),
//! the listener stops accepting and every open connection is allowed to
//! finish before the call returns.

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::app::App;
use crate::error::Error;
use crate::request::Request;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the address [`serve`](Server::serve) binds to.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use waypost::Server;
    /// let server = Server::bind("127.0.0.1:3000");
    /// ```
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { addr }
    }

    /// Serves `app` until SIGTERM or Ctrl-C, then drains open connections.
    pub async fn serve(self, app: impl Into<Arc<App>>) -> Result<(), Error> {
        self.serve_with_shutdown(app, shutdown_signal()).await
    }

    /// Serves `app` until `signal` resolves, then drains open connections.
    pub async fn serve_with_shutdown(
        self,
        app: impl Into<Arc<App>>,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let app = app.into();
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, debug = app.settings().debug, mode = %app.settings().mode, "waypost listening");

        let mut connections = JoinSet::new();
        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Shutdown wins over queued connections.
                biased;

                () = &mut signal => {
                    info!(open = connections.len(), "shutting down, draining connections");
                    break;
                }

                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept failed: {e}");
                            continue;
                        }
                    };

                    let app = Arc::clone(&app);
                    connections.spawn(async move {
                        let svc = service_fn(move |req| dispatch(Arc::clone(&app), req));
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(TokioIo::new(stream), svc)
                            .await
                        {
                            error!(%peer, "connection error: {e}");
                        }
                    });
                }

                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        while connections.join_next().await.is_some() {}
        info!("waypost stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Converts one hyper request, runs it through `app`, converts the result.
///
/// Never fails: an unreadable body is a 400, an error escaping the app or a
/// crashed blocking task is a 500.
async fn dispatch<B>(app: Arc<App>, req: hyper::Request<B>) -> Result<http::Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: fmt::Display,
{
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("failed to read request body: {e}");
            return Ok(empty(http::StatusCode::BAD_REQUEST));
        }
    };

    let uri = parts.uri.path_and_query().map_or("/", |pq| pq.as_str());
    let mut request = Request::new(parts.method.as_str(), uri).with_body(body);
    for (name, value) in &parts.headers {
        match value.to_str() {
            Ok(value) => request = request.with_header(name.as_str(), value),
            Err(_) => warn!(header = %name, "skipping non-ASCII header value"),
        }
    }

    let response = match tokio::task::spawn_blocking(move || app.run(&request)).await {
        Ok(Ok(dispatched)) => dispatched.response.into_http(),
        Ok(Err(e)) => {
            error!(error = %e, kind = e.kind(), "error escaped the middleware chain");
            empty(http::StatusCode::INTERNAL_SERVER_ERROR)
        }
        Err(e) => {
            error!("dispatch task failed: {e}");
            empty(http::StatusCode::INTERNAL_SERVER_ERROR)
        }
    };
    Ok(response)
}

fn empty(status: http::StatusCode) -> http::Response<Full<Bytes>> {
    let mut res = http::Response::new(Full::new(Bytes::new()));
    *res.status_mut() = status;
    res
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on SIGTERM or SIGINT. Only Ctrl-C exists off Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}
