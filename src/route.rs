use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::error::DispatchError;
use crate::method::MethodKind;
use crate::metrics::MetricsBucket;

// ─── Route record ────────────────────────────────────────────────

/// Per-`(path, method)` accounting unit: identity, free-form metadata, and
/// a double-buffered pair of metrics windows.
///
/// One record exists per registration and lives for the whole process. It
/// is shared by `Arc` between the router that created it, every ancestor
/// router it was flattened into at mount time, and the aggregator — so all
/// of them observe the same counters.
///
/// `active` receives samples; `frozen` is the last completed window, handed
/// to readers as an `Arc` that is never mutated after the swap. Both the
/// append and the swap take the record's mutex, which is what makes a
/// rotation a clean partition: a completion lands wholly in whichever
/// bucket is active at the instant its callback runs.
pub struct RouteRecord {
    path: String,
    method: MethodKind,
    state: Mutex<RecordState>,
}

struct RecordState {
    mount_path: String,
    metadata: HashMap<String, Value>,
    active: MetricsBucket,
    frozen: Option<Arc<MetricsBucket>>,
}

impl RouteRecord {
    pub(crate) fn new(path: impl Into<String>, method: MethodKind) -> Arc<Self> {
        Arc::new(Self {
            path: path.into(),
            method,
            state: Mutex::new(RecordState {
                mount_path: String::new(),
                metadata: HashMap::new(),
                active: MetricsBucket::new(),
                frozen: None,
            }),
        })
    }

    // ── Identity ────────────────────────────────────────────────

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> MethodKind {
        self.method
    }

    /// Composed mount prefix; empty until the owning router is mounted.
    pub fn mount_path(&self) -> String {
        self.state.lock().mount_path.clone()
    }

    /// Reporting path: mount prefix + route pattern.
    pub fn full_path(&self) -> String {
        let state = self.state.lock();
        format!("{}{}", state.mount_path, self.path)
    }

    /// Mount-time rewrite: the parent's mount path goes in front of
    /// whatever prefix earlier mounts already composed.
    pub(crate) fn prepend_mount(&self, prefix: &str) {
        if prefix.is_empty() {
            return;
        }
        let mut state = self.state.lock();
        state.mount_path = format!("{prefix}{}", state.mount_path);
    }

    /// Matching is by `(path, method)` only — mount path is deliberately
    /// not part of the key, so identically-pathed routes under different
    /// mounts share attribution, first registered wins.
    pub fn matches(&self, pattern: &str, method: MethodKind) -> bool {
        self.path == pattern && self.method.matches(method)
    }

    // ── Metadata ────────────────────────────────────────────────

    pub fn metadata(&self) -> HashMap<String, Value> {
        self.state.lock().metadata.clone()
    }

    pub fn insert_metadata(&self, key: impl Into<String>, value: Value) {
        self.state.lock().metadata.insert(key.into(), value);
    }

    // ── Metrics windows ─────────────────────────────────────────

    /// Fold one completed request into the active window.
    pub(crate) fn record(&self, elapsed_ms: u64, status: u16, error: Option<&DispatchError>) {
        self.state
            .lock()
            .active
            .record(elapsed_ms, status, error.map(|e| e.to_string()));
    }

    /// Fresh `active` and fresh (empty) `frozen` — called by
    /// `Stats::start` so a restart never leaks prior accumulation.
    pub(crate) fn reset(&self) {
        let mut state = self.state.lock();
        state.active = MetricsBucket::new();
        state.frozen = Some(Arc::new(MetricsBucket::new()));
    }

    /// The rotation swap: the active window becomes the frozen snapshot
    /// and a brand-new bucket starts accumulating. One lock, one exchange.
    pub(crate) fn rotate(&self) {
        let mut state = self.state.lock();
        let completed = std::mem::take(&mut state.active);
        state.frozen = Some(Arc::new(completed));
    }

    /// Copy of the currently-accumulating window (test/report inspection).
    pub fn active(&self) -> MetricsBucket {
        self.state.lock().active.clone()
    }

    /// Last completed window. `None` before the aggregator first starts.
    pub fn frozen(&self) -> Option<Arc<MetricsBucket>> {
        self.state.lock().frozen.clone()
    }
}

impl std::fmt::Debug for RouteRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RouteRecord")
            .field("mount_path", &state.mount_path)
            .field("path", &self.path)
            .field("method", &self.method)
            .field("active_samples", &state.active.requests())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_partitions_samples() {
        let record = RouteRecord::new("/x", MethodKind::Get);
        record.reset();

        record.record(1, 200, None);
        record.record(2, 200, None);
        record.record(3, 404, None);
        record.rotate();

        record.record(4, 200, None);
        record.rotate();

        // second window has exactly the one post-rotation sample
        let frozen = record.frozen().unwrap();
        assert_eq!(frozen.times, vec![4]);
        assert!(record.active().is_empty());
    }

    #[test]
    fn frozen_snapshot_survives_later_writes() {
        let record = RouteRecord::new("/x", MethodKind::Get);
        record.reset();
        record.record(7, 200, None);
        record.rotate();

        let snapshot = record.frozen().unwrap();
        record.record(9, 500, None);
        record.rotate();

        // the Arc we took before keeps pointing at the old window
        assert_eq!(snapshot.times, vec![7]);
    }

    #[test]
    fn mount_prefixes_compose_inner_first() {
        let record = RouteRecord::new("/random", MethodKind::Get);
        record.prepend_mount("/math");
        record.prepend_mount("/api");
        assert_eq!(record.mount_path(), "/api/math");
        assert_eq!(record.full_path(), "/api/math/random");
    }

    #[test]
    fn reset_clears_both_windows() {
        let record = RouteRecord::new("/x", MethodKind::All);
        record.reset();
        record.record(5, 200, None);
        record.rotate();
        record.record(6, 200, None);

        record.reset();
        assert!(record.active().is_empty());
        assert!(record.frozen().unwrap().is_empty());
    }
}
