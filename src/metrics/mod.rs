pub mod bucket;
pub mod summary;

pub use bucket::MetricsBucket;
pub use summary::WindowSummary;
