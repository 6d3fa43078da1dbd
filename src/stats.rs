use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::backend::Backend;
use crate::metrics::WindowSummary;
use crate::report::{self, RouteReport};
use crate::route::RouteRecord;
use crate::router::{InstrumentedRouter, RoutesHandle};

/// Window aggregator: composes the flattened route lists of one or more
/// instrumented routers and rotates every record's metrics windows on a
/// fixed interval.
///
/// Each tick swaps `active` → `frozen` for every owned record and then
/// invokes the caller's rotation callback with the elapsed wall-clock time
/// since the previous tick, so the callback always reads fully-populated,
/// no-longer-mutating frozen windows.
pub struct Stats {
    routes: RoutesHandle,
    task: Option<JoinHandle<()>>,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            routes: Arc::new(Mutex::new(Vec::new())),
            task: None,
        }
    }

    /// Mount an instrumented router into `root` under `prefix` ("" for the
    /// root), activating its recording and adopting its flattened route
    /// list for rotation and reporting.
    pub fn use_router<B, C>(&mut self, root: &mut B, prefix: &str, child: InstrumentedRouter<C>)
    where
        B: Backend + ?Sized,
        C: Backend + 'static,
    {
        child_into(&self.routes, prefix, &child);
        root.mount(prefix, Box::new(child));
    }

    /// Begin periodic rotation. Any previous timer is stopped first and
    /// every owned record's windows are reinitialized, so a restart never
    /// carries accumulation over.
    ///
    /// The first rotation fires one full `every` after this call; each tick
    /// passes the measured elapsed time (not the nominal period) to
    /// `on_rotate` and awaits it before scheduling the next tick's work.
    pub fn start<F, Fut>(&mut self, every: Duration, mut on_rotate: F)
    where
        F: FnMut(Duration) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.stop();

        for record in self.routes.lock().iter() {
            record.reset();
        }

        let routes = Arc::clone(&self.routes);
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // an interval's first tick completes immediately; consume it so
            // the first window spans a full period
            ticker.tick().await;
            let mut last = tokio::time::Instant::now();

            loop {
                ticker.tick().await;
                let now = tokio::time::Instant::now();
                let elapsed = now - last;
                last = now;

                let records: Vec<Arc<RouteRecord>> = routes.lock().clone();
                for record in &records {
                    record.rotate();
                }
                tracing::debug!(
                    routes = records.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "windows rotated"
                );

                on_rotate(elapsed).await;
            }
        }));
    }

    /// Cancel the rotation timer. Idempotent; in-flight requests keep
    /// recording into whatever bucket is currently active.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    // ── Reporting surface ───────────────────────────────────────

    /// Owned records in mount order (shared handles, not copies).
    pub fn routes(&self) -> Vec<Arc<RouteRecord>> {
        self.routes.lock().clone()
    }

    /// Live handle to the route list, for callbacks that outlive `&self`.
    pub fn routes_handle(&self) -> RoutesHandle {
        Arc::clone(&self.routes)
    }

    /// Per-route export view over the frozen windows.
    pub fn snapshot(&self) -> Vec<RouteReport> {
        self.routes
            .lock()
            .iter()
            .map(|r| RouteReport::from_record(r))
            .collect()
    }

    /// Flat persistence document: full reporting path → window digest.
    pub fn document(&self) -> BTreeMap<String, WindowSummary> {
        report::document(&self.routes.lock())
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Stats {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Shared mount bookkeeping: activate the child, rewrite its records'
/// mount prefixes, adopt them into `routes`.
fn child_into<C: Backend>(routes: &RoutesHandle, prefix: &str, child: &InstrumentedRouter<C>) {
    child.activate();
    let child_routes = child.routes_handle();
    let child_routes = child_routes.lock();
    let mut mine = routes.lock();
    for record in child_routes.iter() {
        record.prepend_mount(prefix);
        mine.push(Arc::clone(record));
    }
}
