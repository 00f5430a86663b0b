// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handler ordering specs
//!
//! Verify priority order, sequential execution and registry snapshots.

use crate::prelude::*;

#[tokio::test]
async fn higher_priority_handler_runs_first() {
    let router = Router::new();
    let trail = Trail::new();
    router.on("evt", trail.sync("h1").priority(100));
    router.on("evt", trail.sync("h2").priority(200));

    router.apply("evt", Params::new()).await.unwrap();

    assert_eq!(trail.entries(), vec!["h2", "h1"]);
}

#[tokio::test]
async fn ties_run_in_registration_order() {
    let router = Router::new();
    let trail = Trail::new();
    for label in ["a", "b", "c", "d"] {
        router.on("evt", trail.sync(label).priority(7));
    }

    router.apply("evt", Params::new()).await.unwrap();

    assert_eq!(trail.entries(), vec!["a", "b", "c", "d"]);
}

#[tokio::test]
async fn async_handlers_complete_before_the_next_starts() {
    let router = Router::new();
    let in_flight = Arc::new(Mutex::new(0usize));
    let overlaps = Arc::new(Mutex::new(0usize));

    for _ in 0..3 {
        let in_flight = Arc::clone(&in_flight);
        let overlaps = Arc::clone(&overlaps);
        router.on(
            "evt",
            Handler::future(move |_ctx| {
                let in_flight = Arc::clone(&in_flight);
                let overlaps = Arc::clone(&overlaps);
                Box::pin(async move {
                    {
                        let mut n = in_flight.lock().unwrap();
                        if *n > 0 {
                            *overlaps.lock().unwrap() += 1;
                        }
                        *n += 1;
                    }
                    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                    *in_flight.lock().unwrap() -= 1;
                    Ok(())
                })
            }),
        );
    }

    router.apply("evt", Params::new()).await.unwrap();

    assert_eq!(*overlaps.lock().unwrap(), 0);
}

#[tokio::test]
async fn later_handlers_observe_earlier_mutations() {
    let router = Router::new();
    router.on(
        "message:append:before",
        Handler::sync(|ctx| {
            ctx.params_mut().set("message", json!("edited"))?;
            Ok(())
        })
        .priority(10),
    );
    router.on(
        "message:append:before",
        Handler::sync(|ctx| {
            let message = ctx.params().get("message");
            ctx.set_output(message.unwrap_or_default());
            Ok(())
        }),
    );

    let ctx = router
        .apply(
            relay_core::names::MESSAGE_APPEND_BEFORE,
            relay_core::MessageParams {
                agent: "writer".to_string(),
                message: json!("original"),
            },
        )
        .await
        .unwrap();

    assert_eq!(ctx.output(), Some(&json!("edited")));
}

#[tokio::test]
async fn handler_removing_itself_runs_until_next_dispatch() {
    let router = Router::new();
    let trail = Trail::new();
    let id = Arc::new(Mutex::new(None));

    let own = Arc::clone(&id);
    let recorder = trail.clone();
    let handler_id = router.on(
        "evt",
        Handler::sync(move |ctx| {
            recorder.push("once");
            if let Some(id) = *own.lock().unwrap() {
                ctx.router().deregister(id);
            }
            Ok(())
        }),
    );
    *id.lock().unwrap() = Some(handler_id);

    router.apply("evt", Params::new()).await.unwrap();
    router.apply("evt", Params::new()).await.unwrap();

    assert_eq!(trail.entries(), vec!["once"]);
}

#[tokio::test]
async fn duplicate_registration_is_idempotent() {
    let router = Router::new();
    let trail = Trail::new();
    let handler = trail.sync("h");

    router.on("evt", handler.clone());
    router.on("evt", handler);
    router.apply("evt", Params::new()).await.unwrap();

    assert_eq!(trail.entries(), vec!["h"]);
    assert_eq!(router.handler_count(), 1);
}

#[tokio::test]
async fn wildcard_handlers_share_the_priority_order() {
    let router = Router::new();
    let trail = Trail::new();
    router.on("mode:enter", trail.sync("exact").priority(100));
    router.on_pattern("mode:*", trail.sync("wildcard").priority(200));
    router.on_pattern("tool:*", trail.sync("unrelated").priority(300));

    router.apply("mode:enter", Params::new()).await.unwrap();

    assert_eq!(trail.entries(), vec!["wildcard", "exact"]);
}
