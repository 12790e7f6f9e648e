//! Per-request context.
//!
//! Every request carries a [`RequestContext`] from the moment it is accepted
//! until its response is produced. Middleware stages fill it in as the
//! request travels inward: the request-id stage assigns the identifier, the
//! real-ip stage resolves the client address and the access logger stamps
//! the start time.
//!
//! Each attribute is write-once. A stage that tries to assign an attribute
//! an earlier stage already set gets `false` back and the original value
//! stays.

use std::fmt;
use std::net::IpAddr;
use std::time::Instant;

use uuid::Uuid;

/// Correlation identifier for one inbound request.
///
/// Either echoed from the client's `X-Request-Id` header or freshly
/// generated as a UUID v7 (time-ordered, so log lines sort naturally).
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct RequestId(String);

impl RequestId {
    /// Generates a new, process-unique identifier.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Wraps an identifier received from upstream.
    pub fn from_header(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Attributes derived for a single request by the middleware pipeline.
#[derive(Debug, Default)]
pub struct RequestContext {
    request_id: Option<RequestId>,
    client_addr: Option<IpAddr>,
    started_at: Option<Instant>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn client_addr(&self) -> Option<IpAddr> {
        self.client_addr
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Assigns the request id. Returns `false` if one was already set.
    pub fn set_request_id(&mut self, id: RequestId) -> bool {
        set_once(&mut self.request_id, id)
    }

    /// Assigns the resolved client address. Returns `false` if already set.
    pub fn set_client_addr(&mut self, addr: IpAddr) -> bool {
        set_once(&mut self.client_addr, addr)
    }

    /// Stamps the processing start time. Returns `false` if already set.
    pub fn set_started_at(&mut self, at: Instant) -> bool {
        set_once(&mut self.started_at, at)
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T) -> bool {
    if slot.is_some() {
        return false;
    }
    *slot = Some(value);
    true
}
