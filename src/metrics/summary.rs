use hdrhistogram::Histogram;
use serde::Serialize;
use std::collections::BTreeMap;

use super::MetricsBucket;

/// HdrHistogram range: 1 ms → 10 min, 3 significant figures
const HIST_LOW: u64 = 1;
const HIST_HIGH: u64 = 600_000;
const HIST_SIGFIG: u8 = 3;

/// Percentile digest of one completed window, shaped for export.
/// Serialized straight into the reporting endpoint and the persisted
/// snapshot document.
#[derive(Debug, Clone, Serialize)]
pub struct WindowSummary {
    pub requests: u64,
    pub errors: u64,
    pub mean_ms: f64,
    pub median_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
    pub max_ms: u64,
    pub status_codes: BTreeMap<u16, u64>,
}

impl WindowSummary {
    /// Digest a bucket's raw samples. Zeroed values for an empty window.
    pub fn from_bucket(bucket: &MetricsBucket) -> Self {
        if bucket.is_empty() {
            return Self::empty(bucket);
        }

        let mut hist = Histogram::<u64>::new_with_bounds(HIST_LOW, HIST_HIGH, HIST_SIGFIG)
            .expect("histogram creation");
        for &t in &bucket.times {
            // clamp to the histogram range rather than dropping samples
            let _ = hist.record(t.clamp(HIST_LOW, HIST_HIGH));
        }

        Self {
            requests: bucket.times.len() as u64,
            errors: bucket.errors.len() as u64,
            mean_ms: hist.mean(),
            median_ms: hist.value_at_percentile(50.0),
            p95_ms: hist.value_at_percentile(95.0),
            p99_ms: hist.value_at_percentile(99.0),
            max_ms: hist.max(),
            status_codes: bucket.status_codes.clone(),
        }
    }

    fn empty(bucket: &MetricsBucket) -> Self {
        Self {
            requests: 0,
            errors: bucket.errors.len() as u64,
            mean_ms: 0.0,
            median_ms: 0,
            p95_ms: 0,
            p99_ms: 0,
            max_ms: 0,
            status_codes: bucket.status_codes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_of_empty_window_is_zeroed() {
        let s = WindowSummary::from_bucket(&MetricsBucket::new());
        assert_eq!(s.requests, 0);
        assert_eq!(s.median_ms, 0);
    }

    #[test]
    fn digest_tracks_samples() {
        let mut b = MetricsBucket::new();
        for t in [10u64, 20, 30, 40] {
            b.record(t, 200, None);
        }
        b.record(100, 500, Some("handler failed: x".into()));

        let s = WindowSummary::from_bucket(&b);
        assert_eq!(s.requests, 5);
        assert_eq!(s.errors, 1);
        assert_eq!(s.max_ms, 100);
        assert!(s.mean_ms > 0.0);
        assert_eq!(s.status_codes.get(&200), Some(&4));
    }
}
