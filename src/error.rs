use thiserror::Error;

/// Error surfaced by a dispatch through the routing chain.
///
/// The instrumentation layer never constructs these itself (except for
/// tests); it records them into the matching route's bucket and
/// re-propagates them unchanged. `NoRoute` is reserved for backends that
/// prefer erroring over a 404 response — the recording layer treats an
/// unmatched request as a silent no-op either way.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A handler or middleware failed while processing the request.
    #[error("handler failed: {0}")]
    Handler(String),

    /// The backend had no route for the request.
    #[error("no route for {method} {path}")]
    NoRoute { method: String, path: String },
}

impl DispatchError {
    pub fn handler(msg: impl Into<String>) -> Self {
        DispatchError::Handler(msg.into())
    }
}
