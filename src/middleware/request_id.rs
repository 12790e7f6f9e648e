//! Request identifier stage.
//!
//! Every request leaves with an `X-Request-Id` response header. If the
//! client (or an upstream proxy) already sent one, that value is kept so a
//! request can be followed across services; otherwise a UUID v7 is minted.

use http::{HeaderName, HeaderValue};

use crate::context::RequestId;
use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Next};
use crate::request::Request;

/// Header carrying the request identifier, inbound and outbound.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Assigns the request identifier and echoes it on the response.
#[derive(Clone, Debug, Default)]
pub struct SetRequestId;

impl SetRequestId {
    pub fn new() -> Self {
        Self
    }

    fn incoming(req: &Request) -> Option<RequestId> {
        req.header(REQUEST_ID_HEADER)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(RequestId::from_header)
    }
}

impl Middleware for SetRequestId {
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn handle<'a>(&'a self, mut req: Request, next: Next) -> BoxFuture<'a> {
        Box::pin(async move {
            let id = Self::incoming(&req).unwrap_or_else(RequestId::generate);
            req.context_mut().set_request_id(id);

            // Echo whatever the context holds, even if something upstream of
            // this stage got there first.
            let echoed = req.context().request_id().cloned();
            let mut res = next.run(req).await;

            if let Some(value) = echoed.and_then(|id| HeaderValue::from_str(id.as_str()).ok()) {
                res.insert_header(HeaderName::from_static(REQUEST_ID_HEADER), value);
            }
            res
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use http::{Method, StatusCode};

    use super::*;
    use crate::middleware::Pipeline;
    use crate::router::Router;

    // Reflects the id the handler saw so tests can compare it with the header.
    async fn reflect(req: Request) -> String {
        req.context().request_id().map(ToString::to_string).unwrap_or_default()
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(Router::new().get("/", reflect)).wrap(SetRequestId::new())
    }

    #[tokio::test]
    async fn generates_id_when_header_missing() {
        let res = pipeline().call(Request::test(Method::GET, "/")).await;

        let header = res.headers()[REQUEST_ID_HEADER].to_str().unwrap().to_owned();
        assert!(!header.is_empty());
        assert_eq!(res.body(), header.as_bytes());
    }

    #[tokio::test]
    async fn echoes_incoming_id_unchanged() {
        let req = Request::test(Method::GET, "/").with_header(REQUEST_ID_HEADER, "edge-7f3a/000042");
        let res = pipeline().call(req).await;

        assert_eq!(res.headers()[REQUEST_ID_HEADER], "edge-7f3a/000042");
        assert_eq!(res.body(), b"edge-7f3a/000042");
    }

    #[tokio::test]
    async fn blank_incoming_id_is_replaced() {
        let req = Request::test(Method::GET, "/").with_header(REQUEST_ID_HEADER, "   ");
        let res = pipeline().call(req).await;

        let header = res.headers()[REQUEST_ID_HEADER].to_str().unwrap();
        assert!(!header.trim().is_empty());
    }

    #[tokio::test]
    async fn id_is_echoed_on_not_found() {
        let res = pipeline().call(Request::test(Method::GET, "/missing")).await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert!(res.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_get_distinct_ids() {
        let pipeline = Arc::new(pipeline());
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..256 {
            let pipeline = Arc::clone(&pipeline);
            tasks.spawn(async move {
                let res = pipeline.call(Request::test(Method::GET, "/")).await;
                res.headers()[REQUEST_ID_HEADER].to_str().unwrap().to_owned()
            });
        }

        let mut seen = HashSet::new();
        while let Some(id) = tasks.join_next().await {
            assert!(seen.insert(id.unwrap()), "duplicate request id");
        }
        assert_eq!(seen.len(), 256);
    }
}
