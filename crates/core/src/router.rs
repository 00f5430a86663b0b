// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Router: handler registration, dispatch and relays between routers
//!
//! Every firing builds an [`EventContext`], walks the relay graph once to
//! collect a priority-ordered plan of handlers, then runs the plan:
//!
//! - `apply` awaits every handler in order on the caller's executor
//! - `apply_sync` runs sync handlers inline and each async handler on the
//!   bridge, blocking until it finishes
//! - `emit` runs sync handlers inline and queues the async remainder on the
//!   bridge; failures surface through `join`
//!
//! A handler calling `ctx.stop*()` ends the plan. Relayed routers run after
//! the router they were reached from, depth first, each at most once per
//! firing.

use crate::bridge::{panic_message, Bridge, Completion, TaskFault};
use crate::config::{RelayConfig, RouterConfig, UnhandledPolicy};
use crate::context::{DispatchTrace, EventContext, RouterId};
use crate::error::{BridgeError, DispatchError, HandlerError};
use crate::handler::{AsyncFn, Callback, Handler, HandlerResult};
use crate::params::Params;
use crate::pattern::EventPattern;
use crate::registry::{HandlerId, HandlerRecord, Registry, Target};
use futures::FutureExt;
use std::cmp::Reverse;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, RwLock, Weak};
use tracing::Instrument;

static NEXT_ROUTER: AtomicU64 = AtomicU64::new(1);

/// One handler scheduled by a firing, with the router that owns it
struct Step {
    router: RouterId,
    record: Arc<HandlerRecord>,
}

/// Background work queued by `emit`, awaited by `join`
struct Pending {
    event: String,
    completion: Completion<Result<(), DispatchError>>,
}

struct RouterInner {
    id: RouterId,
    name: Option<String>,
    config: RouterConfig,
    registry: Registry,
    bridge: OnceLock<Arc<Bridge>>,
    /// Routers that receive every event fired here
    relays: RwLock<Vec<Weak<RouterInner>>>,
    pending: Mutex<Vec<Pending>>,
}

/// Named-event dispatcher.
///
/// Cheap to clone; clones share handlers, relays and pending work.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

/// Builder for routers with non-default settings
#[derive(Default)]
pub struct RouterBuilder {
    name: Option<String>,
    config: RouterConfig,
    bridge: Option<Arc<Bridge>>,
}

impl RouterBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Run background work on `bridge` instead of the shared one
    pub fn bridge(mut self, bridge: Arc<Bridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn build(self) -> Router {
        let bridge = OnceLock::new();
        if let Some(b) = self.bridge {
            let _ = bridge.set(b);
        }
        Router {
            inner: Arc::new(RouterInner {
                id: RouterId(NEXT_ROUTER.fetch_add(1, Ordering::Relaxed)),
                name: self.name,
                config: self.config,
                registry: Registry::new(),
                bridge,
                relays: RwLock::new(Vec::new()),
                pending: Mutex::new(Vec::new()),
            }),
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Router with default settings on the shared bridge
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Router with its own bridge, configured from `config`
    pub fn from_config(config: &RelayConfig) -> Result<Self, BridgeError> {
        let bridge = Bridge::start(&config.bridge)?;
        Ok(Self::builder()
            .config(config.router.clone())
            .bridge(bridge)
            .build())
    }

    pub fn id(&self) -> RouterId {
        self.inner.id
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    pub fn config(&self) -> &RouterConfig {
        &self.inner.config
    }

    // -------------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------------

    /// Register `handler` for `event`.
    ///
    /// Registering a clone of an already registered [`Handler`] returns the
    /// existing id. Duplicates are detected by callback allocation, so two
    /// `Handler::sync(f)` calls wrapping the same `f` are two handlers; build
    /// the `Handler` once and clone it to register idempotently.
    pub fn on(&self, event: impl Into<String>, handler: Handler) -> HandlerId {
        self.inner.registry.insert(
            Target::Exact(event.into()),
            handler,
            self.inner.config.default_priority,
        )
    }

    /// Register `handler` for every event matching `pattern`
    pub fn on_pattern(&self, pattern: impl Into<EventPattern>, handler: Handler) -> HandlerId {
        let pattern = pattern.into();
        let target = if pattern.is_exact() {
            Target::Exact(pattern.as_str().to_string())
        } else {
            Target::Pattern(pattern)
        };
        self.inner
            .registry
            .insert(target, handler, self.inner.config.default_priority)
    }

    /// Remove a handler. Dispatches already under way still run it; later
    /// ones do not. Returns false for unknown ids.
    pub fn deregister(&self, id: HandlerId) -> bool {
        self.inner.registry.remove(id)
    }

    pub fn is_registered(&self, id: HandlerId) -> bool {
        self.inner.registry.contains(id)
    }

    pub fn handler_count(&self) -> usize {
        self.inner.registry.len()
    }

    // -------------------------------------------------------------------------
    // Dispatch
    // -------------------------------------------------------------------------

    /// Fire `event` and await every matching handler in priority order.
    ///
    /// The first handler error is returned immediately; effects of handlers
    /// that already ran are kept.
    pub async fn apply(
        &self,
        event: &str,
        params: impl Into<Params>,
    ) -> Result<EventContext, DispatchError> {
        let mut ctx = EventContext::new(event, params.into(), self.clone());
        let steps = self.plan(&mut ctx);
        let span = tracing::debug_span!("relay.apply", event, firing = ctx.trace().firing());

        async {
            tracing::debug!(handlers = steps.len(), "dispatching");
            run_steps(&steps, &mut ctx, false).await
        }
        .instrument(span)
        .await?;

        Ok(ctx)
    }

    /// Alias of [`apply`](Self::apply)
    pub async fn apply_async(
        &self,
        event: &str,
        params: impl Into<Params>,
    ) -> Result<EventContext, DispatchError> {
        self.apply(event, params).await
    }

    /// Blocking form of [`apply`](Self::apply) for callers without an
    /// executor. Async handlers run on the bridge one at a time while this
    /// thread waits.
    ///
    /// Fails with [`BridgeError::Reentrant`] on the bridge's worker thread.
    pub fn apply_sync(
        &self,
        event: &str,
        params: impl Into<Params>,
    ) -> Result<EventContext, DispatchError> {
        let bridge = self.bridge()?;
        bridge.ensure_off_worker()?;

        let mut ctx = EventContext::new(event, params.into(), self.clone());
        let steps = self.plan(&mut ctx);
        let span = tracing::debug_span!("relay.apply_sync", event, firing = ctx.trace().firing());
        let _guard = span.enter();
        tracing::debug!(handlers = steps.len(), "dispatching");

        for step in steps.iter() {
            if ctx.is_stopped() {
                break;
            }
            if !admits(&step.record, &ctx) {
                continue;
            }
            let result = match &step.record.handler.callback {
                Callback::Sync(f) => f(&mut ctx),
                Callback::Async(f) => {
                    let (returned, result) = run_on_bridge(&bridge, Arc::clone(f), ctx, step)?;
                    ctx = returned;
                    result
                }
            };
            if let Err(e) = result {
                return Err(DispatchError::from_handler(ctx.event(), step.record.id, e));
            }
        }

        Ok(ctx)
    }

    /// Fire `event` without waiting.
    ///
    /// Sync handlers run inline (their errors are returned here); async
    /// handlers are queued on the bridge and their outcome is only observable
    /// through [`join`](Self::join) or [`join_sync`](Self::join_sync).
    ///
    /// A sync handler that stops the chain cancels only the async handlers
    /// ordered after it. Queued handlers see the context as the inline pass
    /// left it, predicates included.
    pub fn emit(&self, event: &str, params: impl Into<Params>) -> Result<(), DispatchError> {
        let mut ctx = EventContext::new(event, params.into(), self.clone());
        let steps = self.plan(&mut ctx);
        let span = tracing::debug_span!("relay.emit", event, firing = ctx.trace().firing());
        let _guard = span.enter();

        let mut deferred = Vec::new();
        for step in steps {
            if ctx.is_stopped() {
                break;
            }
            if step.record.handler.is_async() {
                deferred.push(step);
                continue;
            }
            if !admits(&step.record, &ctx) {
                continue;
            }
            if let Callback::Sync(f) = &step.record.handler.callback {
                if let Err(e) = f(&mut ctx) {
                    return Err(DispatchError::from_handler(ctx.event(), step.record.id, e));
                }
            }
        }

        if deferred.is_empty() {
            return Ok(());
        }
        // Deferred steps all precede the stop, so they still run
        ctx.resume();

        tracing::debug!(deferred = deferred.len(), "queueing async handlers");
        let bridge = self.bridge()?;
        let policy = self.inner.config.unhandled;
        let task = async move {
            let mut ctx = ctx;
            let result = run_steps(&deferred, &mut ctx, true).await;
            if let Err(e) = &result {
                if policy == UnhandledPolicy::Log {
                    tracing::warn!(event = ctx.event(), error = %e, "background handler failed");
                }
            }
            result
        };
        let completion = bridge.try_spawn(task.instrument(tracing::Span::current()))?;

        self.inner
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Pending {
                event: event.to_string(),
                completion,
            });
        Ok(())
    }

    /// Wait for all background work queued by `emit` on this router,
    /// including work queued while waiting. Returns the first failure.
    pub async fn join(&self) -> Result<(), DispatchError> {
        let mut first: Option<DispatchError> = None;

        loop {
            let batch = std::mem::take(
                &mut *self.inner.pending.lock().unwrap_or_else(|e| e.into_inner()),
            );
            if batch.is_empty() {
                break;
            }
            for pending in batch {
                let outcome = match pending.completion.wait().await {
                    Ok(result) => result,
                    Err(TaskFault::Panicked(message)) => Err(DispatchError::Panicked {
                        event: pending.event,
                        message,
                    }),
                    Err(TaskFault::Cancelled) => Err(BridgeError::Closed.into()),
                };
                if let Err(e) = outcome {
                    if first.is_none() {
                        first = Some(e);
                    } else {
                        tracing::debug!(error = %e, "further background failure during join");
                    }
                }
            }
        }

        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Blocking form of [`join`](Self::join).
    ///
    /// Fails with [`BridgeError::Reentrant`] on the bridge's worker thread.
    pub fn join_sync(&self) -> Result<(), DispatchError> {
        let bridge = self.bridge()?;
        bridge.block_on(self.join())?
    }

    /// Number of `emit` calls whose background work has not been joined
    pub fn pending(&self) -> usize {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    // -------------------------------------------------------------------------
    // Relays
    // -------------------------------------------------------------------------

    /// Relay events both ways between `self` and `other`
    pub fn broadcast_to(&self, other: &Router) {
        self.relay_to(other);
        other.relay_to(self);
    }

    /// Receive every event fired on `source`; events fired here do not reach it
    pub fn consume_from(&self, source: &Router) {
        source.relay_to(self);
    }

    /// Remove relays between `self` and `other` in both directions
    pub fn disconnect(&self, other: &Router) {
        self.unrelay(other.id());
        other.unrelay(self.id());
    }

    /// Routers that currently receive events fired here
    pub fn relay_targets(&self) -> Vec<Router> {
        self.inner
            .relays
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter_map(Weak::upgrade)
            .map(|inner| Router { inner })
            .collect()
    }

    fn relay_to(&self, target: &Router) {
        if target.id() == self.id() {
            return;
        }
        let mut relays = self.inner.relays.write().unwrap_or_else(|e| e.into_inner());
        relays.retain(|w| w.strong_count() > 0);
        let linked = relays
            .iter()
            .filter_map(Weak::upgrade)
            .any(|r| r.id == target.id());
        if !linked {
            relays.push(Arc::downgrade(&target.inner));
            tracing::debug!(from = %self.id(), to = %target.id(), "relay added");
        }
    }

    fn unrelay(&self, target: RouterId) {
        let mut relays = self.inner.relays.write().unwrap_or_else(|e| e.into_inner());
        relays.retain(|w| w.upgrade().is_some_and(|r| r.id != target));
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn bridge(&self) -> Result<Arc<Bridge>, BridgeError> {
        if let Some(bridge) = self.inner.bridge.get() {
            return Ok(Arc::clone(bridge));
        }
        let shared = Bridge::shared()?;
        Ok(Arc::clone(self.inner.bridge.get_or_init(|| shared)))
    }

    /// Snapshot handlers across this router and everything it relays to,
    /// merged into one priority order
    fn plan(&self, ctx: &mut EventContext) -> Vec<Step> {
        let event = ctx.event().to_string();
        let mut steps = Vec::new();
        collect(&self.inner, &event, ctx.trace_mut(), &mut steps);
        // Stable: ties keep router visit order, then registration order
        steps.sort_by_key(|step| Reverse(step.record.priority));
        steps
    }
}

fn collect(inner: &Arc<RouterInner>, event: &str, trace: &mut DispatchTrace, steps: &mut Vec<Step>) {
    if !trace.enter(inner.id) {
        tracing::trace!(router = %inner.id, firing = trace.firing(), "already visited");
        return;
    }

    steps.extend(inner.registry.snapshot(event).iter().map(|record| Step {
        router: inner.id,
        record: Arc::clone(record),
    }));

    let targets: Vec<Arc<RouterInner>> = inner
        .relays
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .iter()
        .filter_map(Weak::upgrade)
        .collect();
    for target in &targets {
        collect(target, event, trace, steps);
    }
}

/// Evaluate a handler's predicate; failures and panics count as no match
fn admits(record: &HandlerRecord, ctx: &EventContext) -> bool {
    let Some(predicate) = &record.handler.predicate else {
        return true;
    };
    match std::panic::catch_unwind(AssertUnwindSafe(|| predicate(ctx))) {
        Ok(Ok(matched)) => matched,
        Ok(Err(e)) => {
            tracing::debug!(handler = %record.id, event = ctx.event(), error = %e, "predicate failed, skipping handler");
            false
        }
        Err(payload) => {
            tracing::debug!(
                handler = %record.id,
                event = ctx.event(),
                panic = %panic_message(payload),
                "predicate panicked, skipping handler"
            );
            false
        }
    }
}

async fn invoke(record: &HandlerRecord, ctx: &mut EventContext) -> HandlerResult {
    match &record.handler.callback {
        Callback::Sync(f) => f(ctx),
        Callback::Async(f) => f(ctx).await,
    }
}

/// Run a handler, turning a panic into a [`HandlerError::Panicked`]
async fn invoke_isolated(record: &HandlerRecord, ctx: &mut EventContext) -> HandlerResult {
    AssertUnwindSafe(invoke(record, ctx))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(HandlerError::Panicked(panic_message(payload))))
}

async fn run_steps(
    steps: &[Step],
    ctx: &mut EventContext,
    isolate: bool,
) -> Result<(), DispatchError> {
    for step in steps {
        if ctx.is_stopped() {
            tracing::debug!(router = %step.router, "chain stopped");
            break;
        }
        if !admits(&step.record, ctx) {
            continue;
        }
        let result = if isolate {
            invoke_isolated(&step.record, ctx).await
        } else {
            invoke(&step.record, ctx).await
        };
        if let Err(e) = result {
            return Err(DispatchError::from_handler(ctx.event(), step.record.id, e));
        }
    }
    Ok(())
}

/// Move `ctx` onto the bridge for one async handler and block until it
/// comes back
fn run_on_bridge(
    bridge: &Bridge,
    f: Arc<AsyncFn>,
    ctx: EventContext,
    step: &Step,
) -> Result<(EventContext, HandlerResult), DispatchError> {
    let event = ctx.event().to_string();
    let task = async move {
        let mut ctx = ctx;
        let result = AssertUnwindSafe(f(&mut ctx))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(HandlerError::Panicked(panic_message(payload))));
        (ctx, result)
    };

    let outcome = bridge.block_on(async {
        let completion = bridge.spawn(task).await?;
        Ok::<_, BridgeError>(completion.wait().await)
    })??;

    match outcome {
        Ok(pair) => Ok(pair),
        Err(TaskFault::Panicked(message)) => Err(DispatchError::from_handler(
            &event,
            step.record.id,
            HandlerError::Panicked(message),
        )),
        Err(TaskFault::Cancelled) => Err(BridgeError::Closed.into()),
    }
}

impl PartialEq for Router {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Router {}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("id", &self.id())
            .field("name", &self.inner.name)
            .field("handlers", &self.handler_count())
            .finish()
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
