use std::collections::BTreeMap;

use serde::Serialize;

/// Mutable counter set for one time window.
///
/// Write side appends only; nothing is ever removed. Once a bucket is
/// frozen by a rotation it is handed out behind an `Arc` and never touched
/// again, so readers see a stable snapshot without copying.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsBucket {
    /// Per-request wall time in milliseconds, in completion order.
    pub times: Vec<u64>,

    /// Rendered dispatch errors, in completion order.
    pub errors: Vec<String>,

    /// Response status code → occurrence count (only seen codes present).
    pub status_codes: BTreeMap<u16, u64>,
}

impl MetricsBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one completed request into the window.
    pub fn record(&mut self, elapsed_ms: u64, status: u16, error: Option<String>) {
        self.times.push(elapsed_ms);
        if let Some(err) = error {
            self.errors.push(err);
        }
        *self.status_codes.entry(status).or_insert(0) += 1;
    }

    /// Number of completions folded into this window.
    pub fn requests(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_appends_and_counts() {
        let mut b = MetricsBucket::new();
        b.record(12, 200, None);
        b.record(8, 200, None);
        b.record(30, 503, Some("handler failed: boom".into()));

        assert_eq!(b.times, vec![12, 8, 30]);
        assert_eq!(b.errors.len(), 1);
        assert_eq!(b.status_codes.get(&200), Some(&2));
        assert_eq!(b.status_codes.get(&503), Some(&1));
        assert_eq!(b.requests(), 3);
    }

    #[test]
    fn status_counts_sum_to_request_count() {
        let mut b = MetricsBucket::new();
        for status in [200, 200, 404, 500, 200] {
            b.record(1, status, None);
        }
        let total: u64 = b.status_codes.values().sum();
        assert_eq!(total, b.requests() as u64);
    }
}
