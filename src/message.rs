use serde_json::Value;

use crate::method::MethodKind;

// ─── Request ─────────────────────────────────────────────────────

/// Thin request carrier handed through the dispatch chain.
///
/// Deliberately not an HTTP request: the instrumentation layer only ever
/// reads method and path, and the backend only needs enough to match a
/// route. The `matched` field is the backend's report of which registered
/// route pattern actually handled the request (the pattern, not the
/// concrete path) — absent when nothing matched.
#[derive(Debug)]
pub struct Request {
    method: MethodKind,
    path: String,
    matched: Option<String>,
    claimed: bool,
}

impl Request {
    pub fn new(method: MethodKind, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            matched: None,
            claimed: false,
        }
    }

    pub fn method(&self) -> MethodKind {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Route pattern the backend matched, if any.
    pub fn matched_path(&self) -> Option<&str> {
        self.matched.as_deref()
    }

    /// Recorded by the backend when a registered route handles the request.
    pub fn set_matched_path(&mut self, pattern: impl Into<String>) {
        self.matched = Some(pattern.into());
    }

    /// Mount traversal rewrites the path to the child-relative remainder.
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    /// One-shot recording claim. Nested instrumented routers all observe the
    /// same completion; the first (innermost) one to claim it records it and
    /// every ancestor sees `false`.
    pub fn claim_recording(&mut self) -> bool {
        !std::mem::replace(&mut self.claimed, true)
    }
}

// ─── Response ────────────────────────────────────────────────────

/// Thin response carrier: a status code plus an optional JSON body.
#[derive(Debug)]
pub struct Response {
    status: u16,
    body: Option<Value>,
}

impl Response {
    pub fn new() -> Self {
        Self {
            status: 200,
            body: None,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn set_body(&mut self, body: Value) {
        self.body = Some(body);
    }

    pub fn into_body(self) -> Option<Value> {
        self.body
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_claim_is_one_shot() {
        let mut req = Request::new(MethodKind::Get, "/x");
        assert!(req.claim_recording());
        assert!(!req.claim_recording());
    }
}
