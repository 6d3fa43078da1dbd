//! Transparent per-route instrumentation for a routing backend.
//!
//! [`InstrumentedRouter`] wraps any [`Backend`] so every registered route
//! gets latency, error, and status-code accounting without its handlers
//! knowing; [`Stats`] composes one or more instrumented routers and rotates
//! their metrics windows on a fixed interval, handing the caller an
//! immutable frozen snapshot per window for reporting or persistence.
//!
//! Recording stays inert until a router is mounted beneath another router
//! or a [`Stats`] aggregator, so routers never account for traffic that is
//! not wired into a reporting tree.

pub mod backend;
pub mod error;
pub mod message;
pub mod method;
pub mod metrics;
pub mod middleware;
pub mod mini;
pub mod report;
pub mod route;
pub mod router;
pub mod stats;
pub mod store;

pub use backend::{Backend, Service};
pub use error::DispatchError;
pub use message::{Request, Response};
pub use method::MethodKind;
pub use metrics::{MetricsBucket, WindowSummary};
pub use report::RouteReport;
pub use route::RouteRecord;
pub use router::{describe, InstrumentedRouter, MetadataFilter, RouteEntry};
pub use stats::Stats;
