// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-dispatch context: parameters, output and stop state

use crate::error::HandlerError;
use crate::params::Params;
use crate::router::Router;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_FIRING: AtomicU64 = AtomicU64::new(1);

/// Identity of a router instance, unique for the life of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouterId(pub u64);

impl fmt::Display for RouterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "router-{}", self.0)
    }
}

/// Identity of one logical firing, threaded through every relay hop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTrace {
    origin: RouterId,
    firing: u64,
    visited: Vec<RouterId>,
}

impl DispatchTrace {
    pub(crate) fn begin(origin: RouterId) -> Self {
        Self {
            origin,
            firing: NEXT_FIRING.fetch_add(1, Ordering::Relaxed),
            visited: Vec::new(),
        }
    }

    /// Record a hop into `router`; false if this firing already visited it
    pub(crate) fn enter(&mut self, router: RouterId) -> bool {
        if self.visited.contains(&router) {
            return false;
        }
        self.visited.push(router);
        true
    }

    pub fn origin(&self) -> RouterId {
        self.origin
    }

    pub fn firing(&self) -> u64 {
        self.firing
    }

    /// Routers reached by this firing, in visit order
    pub fn visited(&self) -> &[RouterId] {
        &self.visited
    }

    pub fn has_visited(&self, router: RouterId) -> bool {
        self.visited.contains(&router)
    }
}

/// Mutable carrier passed to every handler of one dispatch.
///
/// Created fresh by `emit`, `apply` and `apply_sync` and handed back to the
/// caller once the handler chain finishes or is stopped.
pub struct EventContext {
    event: String,
    params: Params,
    output: Option<Value>,
    stopped: bool,
    exception: Option<HandlerError>,
    router: Router,
    trace: DispatchTrace,
}

impl EventContext {
    pub(crate) fn new(event: &str, params: Params, router: Router) -> Self {
        let trace = DispatchTrace::begin(router.id());
        Self {
            event: event.to_string(),
            params,
            output: None,
            stopped: false,
            exception: None,
            router,
            trace,
        }
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }

    pub fn into_params(self) -> Params {
        self.params
    }

    pub fn output(&self) -> Option<&Value> {
        self.output.as_ref()
    }

    /// Convert the output to `T`, if one was set
    pub fn output_as<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        self.output
            .clone()
            .map(serde_json::from_value)
            .transpose()
    }

    pub fn set_output(&mut self, output: impl Into<Value>) {
        self.output = Some(output.into());
    }

    pub fn take_output(&mut self) -> Option<Value> {
        self.output.take()
    }

    /// Stop the handler chain, keeping the current output
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Stop the handler chain with `output` as the result
    pub fn stop_with_output(&mut self, output: impl Into<Value>) {
        self.output = Some(output.into());
        self.stopped = true;
    }

    /// Stop the handler chain, recording `exception` for the caller
    pub fn stop_with_exception(&mut self, exception: HandlerError) {
        self.exception = Some(exception);
        self.stopped = true;
    }

    /// Clear the stop flag so background handlers queued ahead of the stop
    /// can run
    pub(crate) fn resume(&mut self) {
        self.stopped = false;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn stopped_with_exception(&self) -> bool {
        self.stopped && self.exception.is_some()
    }

    pub fn exception(&self) -> Option<&HandlerError> {
        self.exception.as_ref()
    }

    /// The router the event was fired on
    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn trace(&self) -> &DispatchTrace {
        &self.trace
    }

    pub(crate) fn trace_mut(&mut self) -> &mut DispatchTrace {
        &mut self.trace
    }
}

impl fmt::Debug for EventContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventContext")
            .field("event", &self.event)
            .field("params", &self.params)
            .field("output", &self.output)
            .field("stopped", &self.stopped)
            .field("exception", &self.exception)
            .field("router", &self.router.id())
            .field("trace", &self.trace)
            .finish()
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
