use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::method::MethodKind;
use crate::metrics::{MetricsBucket, WindowSummary};
use crate::route::RouteRecord;

/// Per-route export view: identity, metadata, the last completed window,
/// and its percentile digest. Serializes directly into a reporting
/// endpoint response.
#[derive(Debug, Clone, Serialize)]
pub struct RouteReport {
    pub mount_path: String,
    pub path: String,
    pub method: MethodKind,
    pub metadata: HashMap<String, Value>,
    /// Last completed window; empty when the aggregator has never rotated.
    pub frozen: MetricsBucket,
    pub summary: WindowSummary,
}

impl RouteReport {
    pub fn from_record(record: &RouteRecord) -> Self {
        let frozen = record
            .frozen()
            .map(|b| (*b).clone())
            .unwrap_or_default();
        let summary = WindowSummary::from_bucket(&frozen);
        Self {
            mount_path: record.mount_path(),
            path: record.path().to_owned(),
            method: record.method(),
            metadata: record.metadata(),
            frozen,
            summary,
        }
    }
}

/// Flat snapshot document, shaped for persistence: one entry per route,
/// keyed by the full reporting path (`mount_path + path`).
pub fn document(routes: &[Arc<RouteRecord>]) -> BTreeMap<String, WindowSummary> {
    routes
        .iter()
        .map(|record| {
            let frozen = record.frozen();
            let summary = match frozen {
                Some(bucket) => WindowSummary::from_bucket(&bucket),
                None => WindowSummary::from_bucket(&MetricsBucket::new()),
            };
            (record.full_path(), summary)
        })
        .collect()
}
