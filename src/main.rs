use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request as HttpRequest, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response as HttpResponse};
use axum::routing::get;
use axum::Json;
use serde_json::{json, Value};
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use route_analysis::middleware::{delay, may_fail};
use route_analysis::mini::{handler, MiniRouter, Step};
use route_analysis::{
    describe, report, store, InstrumentedRouter, MethodKind, Request, Response, RouteEntry,
    RouteReport, Service, Stats,
};

/// Snapshot documents outlive the process for a week, like any other
/// short-retention ops data.
const SNAPSHOT_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

struct AppState {
    /// Root routing backend; every HTTP request is funneled into it.
    app: MiniRouter,
    /// Aggregator over the mounted instrumented routers.
    stats: Stats,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port: u16 = env_or("PORT", 3000);
    let rotate_secs: u64 = env_or("ROTATE_SECS", 300);
    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/".to_owned());

    // ── Demo service: a couple of instrumented routes ────────────
    let mut math = InstrumentedRouter::with_filter(MiniRouter::new(), describe());
    let math_routes = math.routes_handle();

    math.get(
        "/",
        vec![
            RouteEntry::note("Lists this service's routes with their last window"),
            RouteEntry::Handler(handler(move |_ctx| {
                let routes = math_routes.clone();
                async move {
                    let records = routes.lock().clone();
                    let reports: Vec<RouteReport> =
                        records.iter().map(|r| RouteReport::from_record(r)).collect();
                    Ok(Step::Respond(
                        200,
                        serde_json::to_value(reports).unwrap_or(Value::Null),
                    ))
                }
            })),
        ],
    );

    math.get(
        "/random",
        vec![
            RouteEntry::note("Responds with a random number in [0, 1)"),
            RouteEntry::Handler(handler(|_ctx| async {
                Ok(Step::Respond(200, json!(rand::random::<f64>())))
            })),
        ],
    );

    math.get(
        "/flaky",
        vec![
            RouteEntry::note("Slow route that fails about a quarter of the time"),
            RouteEntry::Handler(may_fail(0.25, 503)),
            RouteEntry::Handler(delay(Duration::from_millis(25))),
            RouteEntry::Handler(handler(|_ctx| async {
                Ok(Step::Respond(200, json!("survived")))
            })),
        ],
    );

    // ── Composition root ─────────────────────────────────────────
    let mut api = InstrumentedRouter::new(MiniRouter::new());
    api.use_router("/math", math);

    let mut app = MiniRouter::new();
    let mut stats = Stats::new();
    stats.use_router(&mut app, "/api", api);

    // ── Periodic snapshot persistence ────────────────────────────
    let redis = match store::connect(&redis_url).await {
        Ok(conn) => {
            info!(url = %redis_url, "snapshot store connected");
            Some(conn)
        }
        Err(err) => {
            warn!(%err, "snapshot store unavailable, rotations will only be logged");
            None
        }
    };

    let routes = stats.routes_handle();
    stats.start(Duration::from_secs(rotate_secs), move |elapsed| {
        let routes = routes.clone();
        let redis = redis.clone();
        async move {
            let records = routes.lock().clone();
            let document = report::document(&records);
            info!(
                elapsed_ms = elapsed.as_millis() as u64,
                routes = document.len(),
                "window rotated"
            );
            if let Some(conn) = redis {
                match store::save_snapshot(&conn, &document, SNAPSHOT_RETENTION).await {
                    Ok(key) => info!(%key, "snapshot persisted"),
                    Err(err) => error!(%err, "snapshot write failed"),
                }
            }
        }
    });

    let state = Arc::new(AppState { app, stats });

    // ── HTTP front door ──────────────────────────────────────────
    let http = axum::Router::new()
        .route("/stats", get(stats_report))
        .route("/stats/stream", get(stats_stream))
        .fallback(proxy)
        .with_state(state)
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{port}");
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(err) => {
            error!(%err, %addr, "cannot bind listener");
            std::process::exit(1);
        }
    };

    info!(%addr, "listening: try /api/math/random, report at /stats");
    if let Err(err) = axum::serve(listener, http).await {
        error!(%err, "server exited");
    }
}

// ─── HTTP handlers ───────────────────────────────────────────────

/// Funnel every unmatched HTTP request into the instrumented app.
async fn proxy(State(state): State<Arc<AppState>>, request: HttpRequest) -> HttpResponse {
    let method = match request.method().as_str().parse::<MethodKind>() {
        Ok(m) => m,
        Err(_) => {
            return (
                StatusCode::METHOD_NOT_ALLOWED,
                Json(json!({ "error": "unsupported method" })),
            )
                .into_response()
        }
    };

    let mut req = Request::new(method, request.uri().path());
    let mut res = Response::new();

    if let Err(err) = state.app.dispatch(&mut req, &mut res).await {
        warn!(%err, path = req.path(), "dispatch failed");
    }

    let status =
        StatusCode::from_u16(res.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(res.into_body().unwrap_or(Value::Null))).into_response()
}

/// One-shot JSON report over the frozen windows.
async fn stats_report(State(state): State<Arc<AppState>>) -> Json<Vec<RouteReport>> {
    Json(state.stats.snapshot())
}

/// SSE feed: a full snapshot every 2 s, for a live dashboard.
async fn stats_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let interval = tokio::time::interval(Duration::from_secs(2));
    let stream = IntervalStream::new(interval).map(move |_| {
        let snapshot = state.stats.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap_or_default();
        Ok(Event::default().data(json))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
