//! Liveness probe.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `GET /healthz` | Is the process alive? Failure → restart. |
//!
//! ```rust,no_run
//! use vigil::{Router, health};
//!
//! let app = Router::new().get("/healthz", health::liveness);
//! ```

use crate::{Request, Response};

/// Exact liveness payload.
pub const LIVENESS_BODY: &[u8] = br#"{"status":"ok"}"#;

/// Liveness probe handler.
///
/// Always `200 OK`, `application/json`, body `{"status":"ok"}`. If the
/// process can answer HTTP at all it is alive, so this handler touches no
/// dependency and has no failure path.
pub async fn liveness(_req: Request) -> Response {
    Response::json(LIVENESS_BODY.to_vec())
}
