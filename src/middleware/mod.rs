//! Middleware layer.
//!
//! A middleware stage is a transformation `next → handler`: it receives the
//! request, may inspect or annotate it, and either answers directly or hands
//! it to [`Next`]. Stages are composed explicitly by [`Pipeline::wrap`], from
//! the innermost stage outwards, so the order in which they run is the order
//! you read at the call site, bottom to top.
//!
//! The standard stack assembled by [`crate::app`] is:
//!
//! ```text
//! SetRequestId      assigns / echoes X-Request-Id
//!  └ RealIp         resolves the client address
//!    └ AccessLog    one log event per request
//!      └ Recover    panic → 500
//!        └ Timeout  budget exceeded → 504
//!          └ Router (405 + Allow for other methods, 404 for unknown paths)
//! ```
//!
//! `Recover` is the failure boundary: every stage that can panic or time out
//! runs inside it, while the three stages outside it are infallible. That
//! lets the access logger record the 500 or 504 a failed request ended with.

use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::request::Request;
use crate::router::Router;

mod access_log;
mod real_ip;
mod recover;
mod request_id;
mod timeout;

pub use access_log::{AccessEntry, AccessLog};
pub use real_ip::{RealIp, resolve_client_addr};
pub use recover::Recover;
pub use request_id::{REQUEST_ID_HEADER, SetRequestId};
pub use timeout::{DEFAULT_TIMEOUT, Timeout};


/// A single stage of the request pipeline.
///
/// Implementations call [`Next::run`] at most once. Not calling it
/// short-circuits the chain with the stage's own response.
pub trait Middleware: Send + Sync + 'static {
    /// Stable stage name, used in logs.
    fn name(&self) -> &'static str;

    fn handle<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a>;
}

/// The remainder of the pipeline below the current stage.
pub struct Next {
    inner: BoxedHandler,
}

impl Next {
    pub(crate) fn new(inner: BoxedHandler) -> Self {
        Self { inner }
    }

    /// Forwards the request to the next stage. Consumes `self`.
    pub fn run(self, req: Request) -> BoxFuture<'static> {
        self.inner.call(req)
    }
}

/// A middleware bound to the stage it wraps.
struct Layered<M> {
    middleware: Arc<M>,
    next: BoxedHandler,
}

impl<M: Middleware> ErasedHandler for Layered<M> {
    fn call(&self, req: Request) -> BoxFuture<'static> {
        let middleware = Arc::clone(&self.middleware);
        let next = Next::new(Arc::clone(&self.next));
        Box::pin(async move { middleware.handle(req, next).await })
    }
}

/// An immutable, fully composed request pipeline.
///
/// ```rust
/// use std::time::Duration;
/// use vigil::Router;
/// use vigil::middleware::{AccessLog, Pipeline, RealIp, Recover, SetRequestId, Timeout};
///
/// let router = Router::new().get("/healthz", vigil::health::liveness);
/// let pipeline = Pipeline::new(router)
///     .wrap(Timeout::new(Duration::from_secs(5)))
///     .wrap(Recover::new())
///     .wrap(AccessLog::new())
///     .wrap(RealIp::new())
///     .wrap(SetRequestId::new());
/// assert_eq!(
///     pipeline.stages(),
///     ["request_id", "real_ip", "access_log", "recover", "timeout"],
/// );
/// ```
pub struct Pipeline {
    handler: BoxedHandler,
    stages: Vec<&'static str>,
}

impl Pipeline {
    /// Starts a pipeline whose innermost stage is `router`.
    pub fn new(router: Router) -> Self {
        Self { handler: Arc::new(router), stages: Vec::new() }
    }

    /// Wraps the current pipeline in `middleware`, which becomes the new
    /// outermost stage.
    pub fn wrap(self, middleware: impl Middleware) -> Self {
        let mut stages = self.stages;
        stages.insert(0, middleware.name());
        let handler: BoxedHandler = Arc::new(Layered {
            middleware: Arc::new(middleware),
            next: self.handler,
        });
        Self { handler, stages }
    }

    /// Stage names, outermost first.
    pub fn stages(&self) -> &[&'static str] {
        &self.stages
    }

    /// Runs one request through every stage.
    pub fn call(&self, req: Request) -> BoxFuture<'static> {
        self.handler.call(req)
    }
}
