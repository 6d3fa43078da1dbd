use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde_json::{json, Value};

use crate::backend::{Backend, Service};
use crate::error::DispatchError;
use crate::message::{Request, Response};
use crate::method::MethodKind;

// ─── Handler model ───────────────────────────────────────────────

/// What a handler sees of the request. Cloned per handler so handler
/// futures own their input and stay `'static`.
#[derive(Debug, Clone)]
pub struct Ctx {
    pub method: MethodKind,
    pub path: String,
}

/// A handler's verdict: fall through to the next handler in the chain, or
/// finalize the response.
pub enum Step {
    Next,
    Respond(u16, Value),
}

/// Boxed async handler, the `MiniRouter`'s native middleware value.
pub type Handler =
    Arc<dyn Fn(Ctx) -> BoxFuture<'static, Result<Step, DispatchError>> + Send + Sync>;

/// Wrap an async closure as a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Ctx) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<Step, DispatchError>> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

// ─── MiniRouter ──────────────────────────────────────────────────

/// Minimal reference backend: exact-path routes with ordered handler
/// chains, plus prefix mounts. Exists so the instrumentation layer has
/// something real to wrap in the demo and in tests — it is scaffolding,
/// not a routing engine (no patterns, no params).
///
/// Dispatch order: own routes in registration order, then mounts in mount
/// order, then 404.
#[derive(Default)]
pub struct MiniRouter {
    routes: Vec<MiniRoute>,
    mounts: Vec<(String, Box<dyn Service>)>,
}

struct MiniRoute {
    method: MethodKind,
    path: String,
    handlers: Vec<Handler>,
}

impl MiniRouter {
    pub fn new() -> Self {
        Self::default()
    }

    async fn run_chain(
        &self,
        route: &MiniRoute,
        req: &Request,
        res: &mut Response,
    ) -> Result<bool, DispatchError> {
        let ctx = Ctx {
            method: req.method(),
            path: req.path().to_owned(),
        };
        for h in &route.handlers {
            match h(ctx.clone()).await {
                Ok(Step::Next) => continue,
                Ok(Step::Respond(status, body)) => {
                    res.set_status(status);
                    res.set_body(body);
                    return Ok(true);
                }
                Err(err) => {
                    // finalize as a server error before propagating
                    res.set_status(500);
                    res.set_body(json!({ "error": err.to_string() }));
                    return Err(err);
                }
            }
        }
        // chain exhausted without responding: fall through
        Ok(false)
    }
}

#[async_trait]
impl Service for MiniRouter {
    async fn dispatch(
        &self,
        req: &mut Request,
        res: &mut Response,
    ) -> Result<(), DispatchError> {
        // own routes first, registration order
        for route in &self.routes {
            if route.path == req.path() && route.method.matches(req.method()) {
                req.set_matched_path(route.path.clone());
                if self.run_chain(route, req, res).await? {
                    return Ok(());
                }
            }
        }

        // then mounts
        for (prefix, child) in &self.mounts {
            let remainder = match strip_prefix(prefix, req.path()) {
                Some(r) => r,
                None => continue,
            };
            let saved = req.path().to_owned();
            req.set_path(remainder);
            let result = child.dispatch(req, res).await;
            req.set_path(saved);
            // a mounted child that matched (or failed) ends the search
            if result.is_err() || req.matched_path().is_some() {
                return result;
            }
        }

        res.set_status(404);
        res.set_body(json!({ "error": "not found", "path": req.path() }));
        Ok(())
    }
}

impl Backend for MiniRouter {
    type Handler = Handler;

    fn register(&mut self, method: MethodKind, path: &str, handlers: Vec<Handler>) {
        self.routes.push(MiniRoute {
            method,
            path: path.to_owned(),
            handlers,
        });
    }

    fn mount(&mut self, prefix: &str, child: Box<dyn Service>) {
        self.mounts.push((prefix.to_owned(), child));
    }
}

/// Child-relative remainder of `path` under `prefix`, or `None` when the
/// prefix doesn't apply. An empty prefix mounts at the root.
fn strip_prefix(prefix: &str, path: &str) -> Option<String> {
    if prefix.is_empty() {
        return Some(path.to_owned());
    }
    if path == prefix {
        return Some("/".to_owned());
    }
    path.strip_prefix(prefix)
        .filter(|rest| rest.starts_with('/'))
        .map(str::to_owned)
}
