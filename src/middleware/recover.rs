//! Panic recovery.
//!
//! A panic inside a handler (or any stage below this one) must not take the
//! connection down with it, let alone the process. [`Recover`] polls the rest
//! of the pipeline inside `catch_unwind`, turns a panic into
//! `500 Internal Server Error` and logs it together with the request id and
//! the backtrace captured at the panic site.
//!
//! # Backtraces
//!
//! By the time `catch_unwind` returns, the stack that panicked is gone. A
//! process-wide panic hook (installed on first use of [`Recover::new`])
//! captures the backtrace while the stack still exists and parks it in a
//! thread-local, where this stage picks it up. The hook only does this while
//! a guarded future is being polled on that thread; every other panic goes to
//! the previously installed hook unchanged.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Once;
use std::task::{Context, Poll};

use futures_util::FutureExt;
use http::StatusCode;
use tracing::error;

use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Next};
use crate::request::Request;
use crate::response::Response;

struct PanicSite {
    location: Option<String>,
    backtrace: Backtrace,
}

thread_local! {
    static GUARD_DEPTH: Cell<usize> = const { Cell::new(0) };
    static LAST_PANIC: RefCell<Option<PanicSite>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

fn install_panic_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if GUARD_DEPTH.with(Cell::get) == 0 {
                previous(info);
                return;
            }
            let site = PanicSite {
                location: info.location().map(ToString::to_string),
                backtrace: Backtrace::force_capture(),
            };
            LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(site));
        }));
    });
}

/// Marks the current thread as guarded for the duration of one `poll`.
struct DepthGuard;

impl DepthGuard {
    fn enter() -> Self {
        GUARD_DEPTH.with(|d| d.set(d.get() + 1));
        Self
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        GUARD_DEPTH.with(|d| d.set(d.get() - 1));
    }
}

/// Future adapter that keeps the thread marked as guarded while polling.
struct Guarded(BoxFuture<'static>);

impl Future for Guarded {
    type Output = Response;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Response> {
        let _guard = DepthGuard::enter();
        self.0.as_mut().poll(cx)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

/// Converts panics below this stage into `500 Internal Server Error`.
///
/// Constructing one (through `new` or `Default`) installs the panic hook.
#[derive(Clone, Debug)]
pub struct Recover;

impl Recover {
    pub fn new() -> Self {
        install_panic_hook();
        Self
    }
}

impl Default for Recover {
    fn default() -> Self { Self::new() }
}

impl Middleware for Recover {
    fn name(&self) -> &'static str {
        "recover"
    }

    fn handle<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a> {
        let request_id = req.context().request_id().map(ToString::to_string);
        let method = req.method().clone();
        let path = req.path().to_owned();

        // Build the downstream future lazily so a panic while constructing it
        // is caught as well.
        let downstream = Guarded(Box::pin(async move { next.run(req).await }));

        Box::pin(async move {
            match AssertUnwindSafe(downstream).catch_unwind().await {
                Ok(res) => res,
                Err(payload) => {
                    let site = LAST_PANIC.with(|slot| slot.borrow_mut().take());
                    let (location, backtrace) = match &site {
                        Some(site) => (site.location.as_deref().unwrap_or("unknown"), site.backtrace.to_string()),
                        None => ("unknown", String::from("unavailable")),
                    };
                    error!(
                        request_id = request_id.as_deref().unwrap_or("-"),
                        %method,
                        path = %path,
                        panic = panic_message(payload.as_ref()),
                        location,
                        backtrace = %backtrace,
                        "handler panicked"
                    );
                    Response::status(StatusCode::INTERNAL_SERVER_ERROR)
                }
            }
        })
    }
}
