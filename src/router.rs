use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use crate::backend::{Backend, Service};
use crate::error::DispatchError;
use crate::message::{Request, Response};
use crate::method::MethodKind;
use crate::route::RouteRecord;

/// Shared, append-only route list. Routers, mounts, and the aggregator all
/// hold clones of the same handle, so flattening at mount time is just
/// pushing `Arc`s into another list.
pub type RoutesHandle = Arc<Mutex<Vec<Arc<RouteRecord>>>>;

// ─── Registration entries ────────────────────────────────────────

/// One value in a registration's handler list: either a genuine handler for
/// the wrapped backend, or a descriptive sentinel for the metadata filter
/// to consume (e.g. a route description).
pub enum RouteEntry<H> {
    Handler(H),
    Note(String),
}

impl<H> RouteEntry<H> {
    pub fn note(text: impl Into<String>) -> Self {
        RouteEntry::Note(text.into())
    }
}

/// Registration-time hook: inspects the new route's record and the raw
/// entry list, may mutate the record's metadata, and returns the entries
/// that should actually reach the backend.
pub type MetadataFilter<H> =
    Arc<dyn Fn(&RouteRecord, Vec<RouteEntry<H>>) -> Vec<RouteEntry<H>> + Send + Sync>;

/// Ready-made filter: move every `Note` entry into
/// `metadata["description"]` and forward only the handlers. Notes after the
/// first overwrite it.
pub fn describe<H>() -> MetadataFilter<H> {
    Arc::new(|route, entries| {
        entries
            .into_iter()
            .filter(|entry| match entry {
                RouteEntry::Note(text) => {
                    route.insert_metadata("description", json!(text));
                    false
                }
                RouteEntry::Handler(_) => true,
            })
            .collect()
    })
}

// ─── Instrumented router ─────────────────────────────────────────

/// Wraps a routing backend so every registered route gets latency, error,
/// and status-code accounting without the handlers knowing.
///
/// The wrapper is substitutable for the backend: it implements [`Backend`]
/// itself (registration and mounting pass through, instrumented), it
/// implements [`Service`] (dispatch passes through, timed), and whatever
/// else the concrete backend exposes stays reachable via [`inner`].
///
/// Recording is inert until the router is mounted beneath another router or
/// a [`Stats`](crate::stats::Stats) aggregator — the one and only
/// constructed→active transition, and it is idempotent. Requests completed
/// before that point leave no trace.
///
/// [`inner`]: InstrumentedRouter::inner
pub struct InstrumentedRouter<B: Backend> {
    backend: B,
    routes: RoutesHandle,
    active: AtomicBool,
    filter: Option<MetadataFilter<B::Handler>>,
}

impl<B: Backend> InstrumentedRouter<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            routes: Arc::new(Mutex::new(Vec::new())),
            active: AtomicBool::new(false),
            filter: None,
        }
    }

    /// Like [`new`](Self::new), with a metadata filter applied to every
    /// registration.
    pub fn with_filter(backend: B, filter: MetadataFilter<B::Handler>) -> Self {
        Self {
            filter: Some(filter),
            ..Self::new(backend)
        }
    }

    /// The wrapped backend, for any capability this proxy does not cover.
    pub fn inner(&self) -> &B {
        &self.backend
    }

    pub fn inner_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Live handle to this router's route list (shared with every parent
    /// it gets flattened into).
    pub fn routes_handle(&self) -> RoutesHandle {
        Arc::clone(&self.routes)
    }

    /// Snapshot of the route list in registration order.
    pub fn routes(&self) -> Vec<Arc<RouteRecord>> {
        self.routes.lock().clone()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub(crate) fn activate(&self) {
        if !self.active.swap(true, Ordering::Relaxed) {
            tracing::debug!("router activated");
        }
    }

    // ── Registration ────────────────────────────────────────────

    /// Register a route: create its record, run the metadata filter, then
    /// forward the surviving handlers to the backend.
    pub fn route(&mut self, method: MethodKind, path: &str, entries: Vec<RouteEntry<B::Handler>>) {
        let record = RouteRecord::new(path, method);
        self.routes.lock().push(Arc::clone(&record));

        let entries = match &self.filter {
            Some(filter) => filter(&record, entries),
            None => entries,
        };

        let mut handlers = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                RouteEntry::Handler(h) => handlers.push(h),
                RouteEntry::Note(text) => {
                    tracing::warn!(
                        %method,
                        path,
                        note = %text,
                        "descriptive entry dropped: no metadata filter installed"
                    );
                }
            }
        }

        tracing::debug!(%method, path, handlers = handlers.len(), "route registered");
        self.backend.register(method, path, handlers);
    }

    pub fn get(&mut self, path: &str, entries: Vec<RouteEntry<B::Handler>>) {
        self.route(MethodKind::Get, path, entries)
    }

    pub fn post(&mut self, path: &str, entries: Vec<RouteEntry<B::Handler>>) {
        self.route(MethodKind::Post, path, entries)
    }

    pub fn put(&mut self, path: &str, entries: Vec<RouteEntry<B::Handler>>) {
        self.route(MethodKind::Put, path, entries)
    }

    pub fn delete(&mut self, path: &str, entries: Vec<RouteEntry<B::Handler>>) {
        self.route(MethodKind::Delete, path, entries)
    }

    pub fn patch(&mut self, path: &str, entries: Vec<RouteEntry<B::Handler>>) {
        self.route(MethodKind::Patch, path, entries)
    }

    pub fn head(&mut self, path: &str, entries: Vec<RouteEntry<B::Handler>>) {
        self.route(MethodKind::Head, path, entries)
    }

    pub fn options(&mut self, path: &str, entries: Vec<RouteEntry<B::Handler>>) {
        self.route(MethodKind::Options, path, entries)
    }

    /// Catch-all registration: the record matches any request method.
    pub fn all(&mut self, path: &str, entries: Vec<RouteEntry<B::Handler>>) {
        self.route(MethodKind::All, path, entries)
    }

    // ── Mounting ────────────────────────────────────────────────

    /// Mount an instrumented child under `prefix` ("" mounts at the root):
    /// activate its recording, flatten its records into this router's list
    /// with the composed prefix, then hand it to the backend as a mounted
    /// service so its own interception keeps running.
    pub fn use_router<C>(&mut self, prefix: &str, child: InstrumentedRouter<C>)
    where
        C: Backend + 'static,
    {
        child.activate();
        {
            let child_routes = child.routes.lock();
            let mut mine = self.routes.lock();
            for record in child_routes.iter() {
                record.prepend_mount(prefix);
                mine.push(Arc::clone(record));
            }
        }
        tracing::debug!(prefix, "instrumented child mounted");
        self.backend.mount(prefix, Box::new(child));
    }

    /// Mount anything else verbatim — no flattening, no activation.
    pub fn use_service(&mut self, prefix: &str, service: Box<dyn Service>) {
        self.backend.mount(prefix, service);
    }
}

// ─── Proxy surface ───────────────────────────────────────────────

#[async_trait]
impl<B: Backend> Service for InstrumentedRouter<B> {
    /// Timed dispatch: delegate to the backend, measure wall time across
    /// both the success and the failure path, and — when active — post the
    /// outcome into the first record matching the request's matched route
    /// pattern and method. Errors are recorded, then re-propagated.
    async fn dispatch(
        &self,
        req: &mut Request,
        res: &mut Response,
    ) -> Result<(), DispatchError> {
        let start = Instant::now();
        let result = self.backend.dispatch(req, res).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        if self.active.load(Ordering::Relaxed) {
            // Unmatched requests are a deliberate no-op.
            if let Some(pattern) = req.matched_path().map(str::to_owned) {
                let method = req.method();
                let record = {
                    let routes = self.routes.lock();
                    routes
                        .iter()
                        .find(|r| r.matches(&pattern, method))
                        .cloned()
                };
                if let Some(record) = record {
                    // Nested active routers share records; only the first
                    // (innermost) claimant records this completion.
                    if req.claim_recording() {
                        record.record(elapsed_ms, res.status(), result.as_ref().err());
                    }
                }
            }
        }

        result
    }
}

impl<B: Backend> Backend for InstrumentedRouter<B> {
    type Handler = B::Handler;

    /// Registration through the backend surface is still intercepted.
    fn register(&mut self, method: MethodKind, path: &str, handlers: Vec<Self::Handler>) {
        let entries = handlers.into_iter().map(RouteEntry::Handler).collect();
        self.route(method, path, entries);
    }

    /// Non-instrumented mounts pass through untouched.
    fn mount(&mut self, prefix: &str, child: Box<dyn Service>) {
        self.backend.mount(prefix, child);
    }
}
