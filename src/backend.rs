use async_trait::async_trait;

use crate::error::DispatchError;
use crate::message::{Request, Response};
use crate::method::MethodKind;

/// Anything a request can be dispatched into: a routing backend, or an
/// instrumented router mounted inside one. Object safe so backends can hold
/// mounted children as `Box<dyn Service>`.
///
/// Contract: the implementor finalizes `res` (status, body) on both the
/// success and the failure path, and sets `req`'s matched route pattern
/// whenever a registered route handled the request. Errors must propagate —
/// a dispatcher never converts a failure into a silent success.
#[async_trait]
pub trait Service: Send + Sync {
    async fn dispatch(
        &self,
        req: &mut Request,
        res: &mut Response,
    ) -> Result<(), DispatchError>;
}

/// The capability surface a routing component must expose to be wrapped.
///
/// This is the statically-enumerated equivalent of "mirror every property
/// of the wrapped object": per-verb registration collapses to one
/// `register` with a [`MethodKind`], mounting takes any [`Service`], and
/// dispatch comes from the `Service` supertrait. Everything else a concrete
/// backend offers stays reachable through
/// [`InstrumentedRouter::inner`](crate::router::InstrumentedRouter::inner).
pub trait Backend: Service {
    /// The backend's native handler/middleware value.
    type Handler: Send;

    /// Register `handlers` for `(method, path)`, in order.
    fn register(&mut self, method: MethodKind, path: &str, handlers: Vec<Self::Handler>);

    /// Mount a child service under `prefix` ("" mounts at the root),
    /// with whatever nesting semantics the backend natively has.
    fn mount(&mut self, prefix: &str, child: Box<dyn Service>);
}
