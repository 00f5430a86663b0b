// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handler callbacks and predicates

use crate::context::EventContext;
use crate::error::HandlerError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// Result returned by every handler
pub type HandlerResult = Result<(), HandlerError>;

type SyncFn = dyn Fn(&mut EventContext) -> HandlerResult + Send + Sync;
pub(crate) type AsyncFn = dyn for<'a> Fn(&'a mut EventContext) -> BoxFuture<'a, HandlerResult> + Send + Sync;
type PredicateFn = dyn Fn(&EventContext) -> Result<bool, HandlerError> + Send + Sync;

/// Handler implemented as a type rather than a closure
#[async_trait]
pub trait AsyncHandler: Send + Sync {
    async fn handle(&self, ctx: &mut EventContext) -> HandlerResult;
}

#[derive(Clone)]
pub(crate) enum Callback {
    Sync(Arc<SyncFn>),
    Async(Arc<AsyncFn>),
}

impl Callback {
    /// Allocation identity, used to make re-registration idempotent
    fn identity(&self) -> *const () {
        match self {
            Self::Sync(f) => Arc::as_ptr(f) as *const (),
            Self::Async(f) => Arc::as_ptr(f) as *const (),
        }
    }
}

/// A callback plus its registration options.
///
/// Cloning shares the callback; registering a clone for the same event as
/// the original is a no-op that returns the original's id.
#[derive(Clone)]
pub struct Handler {
    pub(crate) callback: Callback,
    pub(crate) priority: Option<i32>,
    pub(crate) predicate: Option<Arc<PredicateFn>>,
}

impl Handler {
    /// Handler that runs inline on the dispatching thread
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&mut EventContext) -> HandlerResult + Send + Sync + 'static,
    {
        Self::with_callback(Callback::Sync(Arc::new(f)))
    }

    /// Handler returning a future; awaited by `apply`, run on the bridge by
    /// `emit` and `apply_sync`
    pub fn future<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a mut EventContext) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        Self::with_callback(Callback::Async(Arc::new(f)))
    }

    /// Wrap an [`AsyncHandler`] implementation
    pub fn from_async<H: AsyncHandler + 'static>(handler: H) -> Self {
        let handler = Arc::new(handler);
        Self::future(move |ctx| {
            let handler = Arc::clone(&handler);
            Box::pin(async move { handler.handle(ctx).await })
        })
    }

    fn with_callback(callback: Callback) -> Self {
        Self {
            callback,
            priority: None,
            predicate: None,
        }
    }

    /// Execution priority; higher runs first
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Only run when `predicate` holds for the current context
    pub fn when<P>(self, predicate: P) -> Self
    where
        P: Fn(&EventContext) -> bool + Send + Sync + 'static,
    {
        self.try_when(move |ctx| Ok(predicate(ctx)))
    }

    /// Like [`when`](Self::when), for predicates that can fail.
    ///
    /// A failing predicate skips the handler; it never aborts the dispatch.
    pub fn try_when<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&EventContext) -> Result<bool, HandlerError> + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    pub fn is_async(&self) -> bool {
        matches!(self.callback, Callback::Async(_))
    }

    pub(crate) fn same_callback(&self, other: &Handler) -> bool {
        self.callback.identity() == other.callback.identity()
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("async", &self.is_async())
            .field("priority", &self.priority)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}
