// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Short-circuit and failure specs
//!
//! Verify stop, handler errors, interrupts and predicate faults.

use crate::prelude::*;

#[tokio::test]
async fn stop_with_output_skips_remaining_handlers() {
    let router = Router::new();
    let trail = Trail::new();
    router.on(
        "tool:call:before",
        Handler::sync(|ctx| {
            ctx.stop_with_output("X");
            Ok(())
        })
        .priority(200),
    );
    router.on("tool:call:before", trail.sync("lower").priority(100));

    let ctx = router.apply("tool:call:before", Params::new()).await.unwrap();

    assert_eq!(ctx.output(), Some(&json!("X")));
    assert!(ctx.is_stopped());
    assert!(trail.entries().is_empty());
}

#[tokio::test]
async fn handler_error_propagates_and_keeps_earlier_effects() {
    let router = Router::new();
    let trail = Trail::new();
    router.on("evt", trail.sync("first").priority(3));
    router.on(
        "evt",
        Handler::sync(|_ctx| Err(HandlerError::failed("disk full"))).priority(2),
    );
    router.on("evt", trail.sync("never").priority(1));

    let err = router.apply("evt", Params::new()).await.unwrap_err();

    assert_eq!(err.handler_error(), Some(&HandlerError::failed("disk full")));
    assert_eq!(trail.entries(), vec!["first"]);
}

#[tokio::test]
async fn interrupt_is_not_a_handler_fault() {
    let router = Router::new();
    router.on(
        "evt",
        Handler::future(|_ctx| Box::pin(async { Err(HandlerError::interrupt("user pressed stop")) })),
    );

    let err = router.apply("evt", Params::new()).await.unwrap_err();

    assert!(matches!(err, DispatchError::Interrupted { .. }));
    assert!(err.handler_error().is_none());
}

#[tokio::test]
async fn faulty_predicate_only_skips_its_handler() {
    let router = Router::new();
    let trail = Trail::new();
    router.on(
        "evt",
        trail
            .sync("guarded")
            .try_when(|_ctx| Err(HandlerError::failed("predicate bug"))),
    );
    router.on("evt", trail.sync("other"));

    let ctx = router.apply("evt", Params::new()).await.unwrap();

    assert_eq!(trail.entries(), vec!["other"]);
    assert!(!ctx.is_stopped());
}

#[tokio::test]
async fn predicate_sees_current_parameters() {
    let router = Router::new();
    let trail = Trail::new();
    router.on(
        "tool:call:before",
        trail
            .sync("shell")
            .when(|ctx| ctx.params().get("tool") == Some(json!("shell"))),
    );

    let tool = |name: &str| relay_core::ToolParams {
        agent: "a".to_string(),
        tool: name.to_string(),
        ..Default::default()
    };
    router.apply("tool:call:before", tool("search")).await.unwrap();
    router.apply("tool:call:before", tool("shell")).await.unwrap();

    assert_eq!(trail.entries(), vec!["shell"]);
}
