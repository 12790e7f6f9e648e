//! Request timeout guard.

use std::time::Duration;

use http::StatusCode;
use tracing::warn;

use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Next};
use crate::request::Request;
use crate::response::Response;

/// Processing budget used by [`crate::app`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Races the rest of the pipeline against a timer.
///
/// If the budget runs out first, the downstream future is dropped (which
/// cancels it at its next `.await` point) and the client gets
/// `504 Gateway Timeout`. Responses are fully buffered, so nothing has been
/// written to the socket when that happens.
#[derive(Clone, Debug)]
pub struct Timeout {
    duration: Duration,
}

impl Timeout {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Default for Timeout {
    fn default() -> Self { Self::new(DEFAULT_TIMEOUT) }
}

impl Middleware for Timeout {
    fn name(&self) -> &'static str {
        "timeout"
    }

    fn handle<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a> {
        let request_id = req.context().request_id().map(ToString::to_string);
        let method = req.method().clone();
        let path = req.path().to_owned();

        Box::pin(async move {
            match tokio::time::timeout(self.duration, next.run(req)).await {
                Ok(res) => res,
                Err(_elapsed) => {
                    warn!(
                        request_id = request_id.as_deref().unwrap_or("-"),
                        %method,
                        path = %path,
                        budget = ?self.duration,
                        "request timed out"
                    );
                    Response::status(StatusCode::GATEWAY_TIMEOUT)
                }
            }
        })
    }
}
