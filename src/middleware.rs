use std::time::Duration;

use serde_json::json;

use crate::mini::{handler, Handler, Step};

/// Middleware that holds every request for a fixed time before falling
/// through. Handy for making latency windows visibly non-trivial.
pub fn delay(wait: Duration) -> Handler {
    handler(move |_ctx| async move {
        tokio::time::sleep(wait).await;
        Ok(Step::Next)
    })
}

/// Fault-injection middleware: with probability `ratio`, finalize the
/// request with `status` instead of falling through.
pub fn may_fail(ratio: f64, status: u16) -> Handler {
    handler(move |_ctx| async move {
        if rand::random::<f64>() < ratio {
            Ok(Step::Respond(status, json!({ "error": "injected failure" })))
        } else {
            Ok(Step::Next)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::MethodKind;
    use crate::mini::Ctx;

    fn ctx() -> Ctx {
        Ctx {
            method: MethodKind::Get,
            path: "/".into(),
        }
    }

    #[tokio::test]
    async fn may_fail_with_ratio_zero_never_fires() {
        let mw = may_fail(0.0, 503);
        for _ in 0..20 {
            assert!(matches!(mw(ctx()).await.unwrap(), Step::Next));
        }
    }

    #[tokio::test]
    async fn may_fail_with_ratio_one_always_fires() {
        let mw = may_fail(1.0, 503);
        match mw(ctx()).await.unwrap() {
            Step::Respond(status, _) => assert_eq!(status, 503),
            Step::Next => panic!("expected injected failure"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn delay_waits_then_falls_through() {
        let mw = delay(Duration::from_millis(250));
        let before = tokio::time::Instant::now();
        let step = mw(ctx()).await.unwrap();
        assert!(matches!(step, Step::Next));
        assert!(before.elapsed() >= Duration::from_millis(250));
    }
}
