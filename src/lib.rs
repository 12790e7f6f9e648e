//! # vigil
//!
//! A minimal HTTP service bootstrap: one liveness route behind a fixed,
//! explicitly composed middleware pipeline.
//!
//! ## What you get
//!
//! - `GET /healthz` → `200 OK`, `application/json`, `{"status":"ok"}`
//! - `405 Method Not Allowed` (with `Allow: GET`) for other methods on `/healthz`
//! - `404 Not Found` for every other path
//! - An `X-Request-Id` on every response (echoed or generated)
//! - Client address resolution from `True-Client-IP` / `X-Real-IP` /
//!   `X-Forwarded-For`
//! - One access-log event per request
//! - Panics become `500`, requests over budget become `504`
//!
//! ## Quick start
//!
//! ```rust,no_run
//! #[tokio::main]
//! async fn main() -> Result<(), vigil::Error> {
//!     let config = vigil::load_config()?;
//!     vigil::Server::bind(config.addr()).await?.serve(vigil::app()).await
//! }
//! ```
//!
//! ## Building your own pipeline
//!
//! [`app`] is nothing more than a [`Router`] wrapped stage by stage; build the
//! same thing by hand to add routes or change the timeout:
//!
//! ```rust
//! use std::time::Duration;
//! use vigil::{Request, Response, Router, health};
//! use vigil::middleware::{AccessLog, Pipeline, RealIp, Recover, SetRequestId, Timeout};
//!
//! async fn version(_req: Request) -> Response {
//!     Response::json(br#"{"version":"1.2.3"}"#.to_vec())
//! }
//!
//! let router = Router::new()
//!     .get("/healthz", health::liveness)
//!     .get("/version", version);
//!
//! let app = Pipeline::new(router)
//!     .wrap(Timeout::new(Duration::from_secs(5)))
//!     .wrap(Recover::new())
//!     .wrap(AccessLog::new())
//!     .wrap(RealIp::new())
//!     .wrap(SetRequestId::new());
//! ```

mod config;
mod context;
mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod health;
pub mod middleware;
pub mod telemetry;

pub use config::{Config, DEFAULT_PORT, PORT_VAR, load_config};
pub use context::{RequestContext, RequestId};
pub use error::{ConfigError, Error};
pub use handler::{BoxFuture, Handler};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;

use middleware::{AccessLog, DEFAULT_TIMEOUT, Pipeline, RealIp, Recover, SetRequestId, Timeout};

/// The service: `GET /healthz` behind the standard middleware stack.
///
/// Stages are listed innermost first. `Recover` must enclose `Timeout` and
/// the router; `SetRequestId` and `RealIp` must run before `AccessLog` reads
/// what they set.
pub fn app() -> Pipeline {
    let router = Router::new().get("/healthz", health::liveness);

    Pipeline::new(router)
        .wrap(Timeout::new(DEFAULT_TIMEOUT))
        .wrap(Recover::new())
        .wrap(AccessLog::new())
        .wrap(RealIp::new())
        .wrap(SetRequestId::new())
}
