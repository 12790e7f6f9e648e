//! Handler trait and type erasure.
//!
//! # How handlers and middleware are stored
//!
//! The router holds handlers of *different* types in one
//! `HashMap<Method, Tree>`, and every middleware stage wraps "whatever comes
//! next" without knowing its concrete type. Both problems have the same
//! answer: a trait object (`dyn ErasedHandler`) behind an `Arc`.
//!
//! ```text
//! async fn liveness(req: Request) -> Response { … }   ← user writes this
//!        ↓ router.get("/healthz", liveness)
//! liveness.into_boxed_handler()                       ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(liveness))                       ← BoxedHandler
//!        ↓ Pipeline::new(router).wrap(…)
//! Arc::new(Layered { middleware, next })              ← also a BoxedHandler
//!        ↓
//! handler.call(req)  at request time                  ← one vtable dispatch per stage
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// Terminal handlers produce `BoxFuture<'static>`; middleware stages may
/// borrow from themselves while they run, hence the lifetime parameter.
pub type BoxFuture<'a> = Pin<Box<dyn Future<Output = Response> + Send + 'a>>;

/// Internal dispatch interface shared by route handlers and middleware.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture<'static>;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid route handler.
///
/// Satisfied automatically by any function with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// The trait is sealed; only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Bridges a concrete handler function to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<'static> {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};

    async fn created(_req: Request) -> StatusCode {
        StatusCode::CREATED
    }

    #[tokio::test]
    async fn fn_handler_converts_return_value_into_response() {
        let handler = created.into_boxed_handler();
        let response = handler.call(Request::test(Method::POST, "/things")).await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        assert_eq!(response.body_len(), 0);
    }

    #[tokio::test]
    async fn closures_are_handlers() {
        let handler = (|req: Request| async move { req.path().to_owned() }).into_boxed_handler();
        let response = handler.call(Request::test(Method::GET, "/echo")).await;
        assert_eq!(response.body(), b"/echo");
    }
}
