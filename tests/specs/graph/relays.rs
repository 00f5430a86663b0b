// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Router graph specs
//!
//! Verify broadcast and consume links, fan-out, fan-in and cycle safety.

use crate::prelude::*;

fn router_with(trail: &Trail, label: &str) -> Router {
    let router = Router::builder().name(label).build();
    router.on("evt", trail.sync(label));
    router
}

#[tokio::test]
async fn broadcast_triggers_the_other_router_both_ways() {
    let trail = Trail::new();
    let a = router_with(&trail, "a");
    let b = router_with(&trail, "b");
    a.broadcast_to(&b);

    a.apply("evt", Params::new()).await.unwrap();
    assert_eq!(trail.entries(), vec!["a", "b"]);

    trail.clear();
    b.apply("evt", Params::new()).await.unwrap();
    assert_eq!(trail.entries(), vec!["b", "a"]);
}

#[tokio::test]
async fn relayed_handlers_run_in_priority_order() {
    let trail = Trail::new();
    let a = Router::new();
    let b = Router::new();
    a.on("evt", trail.sync("a100").priority(100));
    b.on("evt", trail.sync("b200").priority(200));
    a.broadcast_to(&b);

    a.apply("evt", Params::new()).await.unwrap();

    assert_eq!(trail.entries(), vec!["b200", "a100"]);
}

#[tokio::test]
async fn consume_only_flows_from_the_source() {
    let trail = Trail::new();
    let source = router_with(&trail, "source");
    let consumer = router_with(&trail, "consumer");
    consumer.consume_from(&source);

    source.apply("evt", Params::new()).await.unwrap();
    assert_eq!(trail.entries(), vec!["source", "consumer"]);

    trail.clear();
    consumer.apply("evt", Params::new()).await.unwrap();
    assert_eq!(trail.entries(), vec!["consumer"]);
}

#[tokio::test]
async fn bidirectional_cycle_runs_each_router_once() {
    let trail = Trail::new();
    let routers: Vec<Router> = ["r0", "r1", "r2", "r3"]
        .iter()
        .map(|label| router_with(&trail, label))
        .collect();
    for (i, router) in routers.iter().enumerate() {
        router.broadcast_to(&routers[(i + 1) % routers.len()]);
    }

    for router in &routers {
        trail.clear();
        let ctx = router.apply("evt", Params::new()).await.unwrap();

        let mut seen = trail.entries();
        seen.sort();
        assert_eq!(seen, vec!["r0", "r1", "r2", "r3"]);
        assert_eq!(ctx.trace().visited().len(), 4);
    }
}

#[tokio::test]
async fn fan_out_and_fan_in() {
    let trail = Trail::new();
    let hub = router_with(&trail, "hub");
    let left = router_with(&trail, "left");
    let right = router_with(&trail, "right");
    let sink = router_with(&trail, "sink");
    left.consume_from(&hub);
    right.consume_from(&hub);
    sink.consume_from(&left);
    sink.consume_from(&right);

    hub.apply("evt", Params::new()).await.unwrap();

    let entries = trail.entries();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries.iter().filter(|e| *e == "sink").count(), 1);
}

#[tokio::test]
async fn relayed_handlers_can_stop_the_chain() {
    let trail = Trail::new();
    let a = Router::new();
    let b = Router::new();
    b.on(
        "evt",
        Handler::sync(|ctx| {
            ctx.stop_with_output("from b");
            Ok(())
        }),
    );
    let c = router_with(&trail, "c");
    b.consume_from(&a);
    c.consume_from(&a);

    let ctx = a.apply("evt", Params::new()).await.unwrap();

    assert_eq!(ctx.output(), Some(&json!("from b")));
    assert!(trail.entries().is_empty());
}

#[test]
fn blocking_dispatch_follows_relays() {
    let trail = Trail::new();
    let a = isolated_router("spec-relay-sync", 16);
    let b = Router::new();
    b.on("evt", trail.future("b-async"));
    a.on("evt", trail.sync("a-sync"));
    a.broadcast_to(&b);

    a.apply_sync("evt", Params::new()).unwrap();

    assert_eq!(trail.entries(), vec!["a-sync", "b-async"]);
}
