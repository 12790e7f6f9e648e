//! HTTP listener and connection loop.
//!
//! Every accepted connection gets its own tokio task, and every request on
//! it runs through the shared [`Pipeline`]. The pipeline is immutable, so
//! connections never contend on anything but the `Arc` refcount.
//!
//! There is no shutdown handling: the server runs until the process is
//! stopped.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::error::Error;
use crate::middleware::Pipeline;
use crate::request::Request;

/// Longest pause between accept retries when the process is out of file
/// descriptors.
const MAX_ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// A bound HTTP listener.
pub struct Server {
    listener: TcpListener,
    addr: SocketAddr,
}

impl Server {
    /// Binds the listener. Port `0` picks a free port; see
    /// [`local_addr`](Server::local_addr).
    ///
    /// ```rust,no_run
    /// # async fn run() -> Result<(), vigil::Error> {
    /// let server = vigil::Server::bind(([0, 0, 0, 0], 8080).into()).await?;
    /// server.serve(vigil::app()).await
    /// # }
    /// ```
    pub async fn bind(addr: SocketAddr) -> Result<Self, Error> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;
        let addr = listener.local_addr()?;
        Ok(Self { listener, addr })
    }

    /// The address actually bound.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Accepts connections and dispatches their requests through `app`.
    ///
    /// Runs until the listener fails permanently. Per-connection errors are
    /// logged and never end the loop.
    pub async fn serve(self, app: Pipeline) -> Result<(), Error> {
        let app = Arc::new(app);
        let mut backoff = Duration::ZERO;

        info!(addr = %self.addr, stages = ?app.stages(), "vigil listening");

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(conn) => {
                    backoff = Duration::ZERO;
                    conn
                }
                Err(e) if is_connection_error(&e) => {
                    debug!("accept error: {e}");
                    continue;
                }
                Err(e) if is_resource_exhaustion(&e) => {
                    backoff = (backoff * 2).clamp(Duration::from_millis(5), MAX_ACCEPT_BACKOFF);
                    error!(retry_in = ?backoff, "accept error: {e}");
                    tokio::time::sleep(backoff).await;
                    continue;
                }
                Err(e) => {
                    error!("accept error: {e}");
                    return Err(Error::Accept(e));
                }
            };

            let app = Arc::clone(&app);
            let io = TokioIo::new(stream);

            tokio::spawn(async move {
                // Called once per request on the connection.
                let svc = service_fn(move |req| {
                    let fut = app.call(Request::from_http(req, peer));
                    async move { Ok::<_, std::convert::Infallible>(fut.await.into_http()) }
                });

                // HTTP/1.1 or h2c, whatever the client speaks.
                if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                    .serve_connection(io, svc)
                    .await
                {
                    error!(%peer, "connection error: {e}");
                }
            });
        }
    }
}

/// Failures that concern only the connection being accepted.
fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}

/// EMFILE / ENFILE: transient, clears as connections close.
fn is_resource_exhaustion(e: &io::Error) -> bool {
    matches!(e.raw_os_error(), Some(23 | 24))
}
