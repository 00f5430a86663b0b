// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fire-and-forget specs
//!
//! Verify that `emit` returns before async handlers finish and that their
//! failures only surface through `join`.

use crate::prelude::*;
use tokio::sync::oneshot;

/// Async handler that waits for `release` before recording `label`
fn gated(trail: &Trail, label: &str) -> (Handler, oneshot::Sender<()>) {
    let (release, gate) = oneshot::channel::<()>();
    let gate = Arc::new(Mutex::new(Some(gate)));
    let trail = trail.clone();
    let label = label.to_string();
    let handler = Handler::future(move |_ctx| {
        let gate = gate.lock().unwrap().take();
        let trail = trail.clone();
        let label = label.clone();
        Box::pin(async move {
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            trail.push(label);
            Ok(())
        })
    });
    (handler, release)
}

#[test]
fn emit_returns_before_async_handlers_finish() {
    let router = isolated_router("spec-emit-returns", 16);
    let trail = Trail::new();
    let (handler, release) = gated(&trail, "background");
    router.on("evt", handler);
    router.on("evt", trail.sync("inline").priority(500));

    router.emit("evt", Params::new()).unwrap();

    assert_eq!(trail.entries(), vec!["inline"]);
    assert_eq!(router.pending(), 1);

    release.send(()).unwrap();
    router.join_sync().unwrap();

    assert_eq!(trail.entries(), vec!["inline", "background"]);
    assert_eq!(router.pending(), 0);
}

#[test]
fn background_errors_are_only_visible_at_join() {
    let router = isolated_router("spec-emit-errors", 16);
    router.on(
        "evt",
        Handler::future(|_ctx| Box::pin(async { Err(HandlerError::failed("upload failed")) })),
    );

    assert!(router.emit("evt", Params::new()).is_ok());

    let err = router.join_sync().unwrap_err();
    assert_eq!(err.handler_error(), Some(&HandlerError::failed("upload failed")));
    assert!(router.join_sync().is_ok());
}

#[test]
fn join_drains_every_pending_emit() {
    let router = isolated_router("spec-emit-drain", 64);
    let trail = Trail::new();
    router.on("evt", trail.future("done"));

    for _ in 0..10 {
        router.emit("evt", Params::new()).unwrap();
    }
    router.join_sync().unwrap();

    assert_eq!(trail.entries().len(), 10);
    assert_eq!(router.pending(), 0);
}

#[test]
fn join_only_drains_its_own_router() {
    let busy = isolated_router("spec-emit-own", 16);
    let idle = Router::new();
    let trail = Trail::new();
    let (handler, release) = gated(&trail, "busy");
    busy.on("evt", handler);

    busy.emit("evt", Params::new()).unwrap();

    idle.join_sync().unwrap();
    assert_eq!(busy.pending(), 1);

    release.send(()).unwrap();
    busy.join_sync().unwrap();
    assert_eq!(trail.entries(), vec!["busy"]);
}

#[tokio::test]
async fn join_can_be_awaited() {
    let router = isolated_router("spec-emit-await", 16);
    let trail = Trail::new();
    router.on("evt", trail.future("async"));

    router.emit("evt", Params::new()).unwrap();
    router.join().await.unwrap();

    assert_eq!(trail.entries(), vec!["async"]);
}

#[test]
fn inline_stop_spares_async_handlers_ranked_above_it() {
    let router = isolated_router("spec-emit-stop", 16);
    let trail = Trail::new();
    router.on("evt", trail.future("async200").priority(200));
    router.on(
        "evt",
        Handler::sync(|ctx| {
            ctx.stop();
            Ok(())
        })
        .priority(100),
    );
    router.on("evt", trail.future("async50").priority(50));

    router.emit("evt", Params::new()).unwrap();
    router.join_sync().unwrap();

    assert_eq!(trail.entries(), vec!["async200"]);
}
