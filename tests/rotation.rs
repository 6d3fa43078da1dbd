//! Window rotation under a paused tokio clock: partition guarantees,
//! restart semantics, and the rotation callback contract.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;

use route_analysis::mini::{handler, Handler, MiniRouter, Step};
use route_analysis::{
    InstrumentedRouter, MethodKind, Request, Response, RouteEntry, RouteRecord, Service, Stats,
};

const PERIOD: Duration = Duration::from_secs(60);

fn ok() -> Handler {
    handler(|_ctx| async { Ok(Step::Respond(200, json!("ok"))) })
}

/// Root app with one instrumented `GET /random` mounted under a not yet
/// started aggregator.
fn wired() -> (MiniRouter, Stats, Arc<RouteRecord>) {
    let mut router = InstrumentedRouter::new(MiniRouter::new());
    router.get("/random", vec![RouteEntry::Handler(ok())]);
    let record = router.routes()[0].clone();

    let mut app = MiniRouter::new();
    let mut stats = Stats::new();
    stats.use_router(&mut app, "", router);
    (app, stats, record)
}

fn start_with_channel(stats: &mut Stats) -> mpsc::UnboundedReceiver<Duration> {
    let (tx, rx) = mpsc::unbounded_channel();
    stats.start(PERIOD, move |elapsed| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(elapsed);
        }
    });
    rx
}

async fn send(app: &MiniRouter, path: &str) {
    let mut req = Request::new(MethodKind::Get, path);
    let mut res = Response::new();
    app.dispatch(&mut req, &mut res).await.unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test(start_paused = true)]
async fn ten_requests_then_one_rotation_freeze_cleanly() {
    let (app, mut stats, record) = wired();
    let mut rx = start_with_channel(&mut stats);

    for _ in 0..10 {
        send(&app, "/random").await;
    }

    let elapsed = rx.recv().await.expect("rotation tick");
    assert!(elapsed >= PERIOD);

    let frozen = record.frozen().expect("frozen window after rotation");
    assert_eq!(frozen.times.len(), 10);
    assert_eq!(frozen.status_codes.get(&200), Some(&10));
    assert!(frozen.errors.is_empty());
    assert!(record.active().is_empty());
}

#[tokio::test(start_paused = true)]
async fn consecutive_rotations_partition_the_samples() {
    let (app, mut stats, record) = wired();
    let mut rx = start_with_channel(&mut stats);

    for _ in 0..3 {
        send(&app, "/random").await;
    }
    rx.recv().await.unwrap();
    let first = record.frozen().unwrap();

    for _ in 0..2 {
        send(&app, "/random").await;
    }
    rx.recv().await.unwrap();
    let second = record.frozen().unwrap();

    // every sample in exactly one window, none lost, none double-counted
    assert_eq!(first.times.len(), 3);
    assert_eq!(second.times.len(), 2);
    assert!(record.active().is_empty());
}

#[tokio::test(start_paused = true)]
async fn restart_resets_every_window() {
    let (app, mut stats, record) = wired();
    let mut rx = start_with_channel(&mut stats);

    for _ in 0..4 {
        send(&app, "/random").await;
    }
    rx.recv().await.unwrap();
    assert_eq!(record.frozen().unwrap().times.len(), 4);

    send(&app, "/random").await;
    stats.stop();
    stats.stop(); // idempotent
    assert!(!stats.is_running());

    let mut rx = start_with_channel(&mut stats);
    assert!(stats.is_running());
    assert!(record.active().is_empty());
    assert!(record.frozen().unwrap().is_empty());

    // the restarted timer rotates on its own schedule
    rx.recv().await.unwrap();
    assert!(record.frozen().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_the_timer_but_not_recording() {
    let (app, mut stats, record) = wired();
    let mut rx = start_with_channel(&mut stats);
    rx.recv().await.unwrap();

    stats.stop();

    // no further ticks arrive: the aborted task either closes the channel
    // or simply never sends again
    let next = tokio::time::timeout(PERIOD * 3, rx.recv()).await;
    assert!(matches!(next, Ok(None) | Err(_)));

    // recording continues into the current active bucket
    send(&app, "/random").await;
    assert_eq!(record.active().times.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn rotation_measures_elapsed_wall_clock() {
    let (_app, mut stats, _record) = wired();
    let mut rx = start_with_channel(&mut stats);

    let first = rx.recv().await.unwrap();
    let second = rx.recv().await.unwrap();
    assert!(first >= PERIOD);
    assert!(second >= PERIOD);
}
