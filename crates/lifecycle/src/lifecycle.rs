// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle events around a method call
//!
//! A [`Lifecycle`] fires `{event}:before`, `{event}:after`, `{event}:error`
//! and `{event}:finally` around a body, each carrying
//! [`LifecycleParams`]. Handlers can intercept the call:
//!
//! - BEFORE: setting an output substitutes the result; the body and the
//!   AFTER phase are skipped
//! - AFTER: stopping with an output replaces the result
//! - ERROR: stopping with an output recovers; otherwise the error stands
//! - FINALLY: observation only, its failures are logged
//!
//! Stopping with an exception in BEFORE, AFTER or ERROR fails the call with
//! [`DispatchError::Rejected`].

use crate::sink::{Dispatch, Instrumented};
use bitflags::bitflags;
use relay_core::{names, DispatchError, EventContext, LifecycleParams, Params};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::Display;
use std::future::Future;
use std::time::Instant;
use tracing::Instrument;

bitflags! {
    /// Which lifecycle events a wrapped call fires
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Phases: u8 {
        const BEFORE = 1;
        const AFTER = 1 << 1;
        const ERROR = 1 << 2;
        const FINALLY = 1 << 3;
        const ALL = Self::BEFORE.bits()
            | Self::AFTER.bits()
            | Self::ERROR.bits()
            | Self::FINALLY.bits();
    }
}

type Dispatched = Result<Option<EventContext>, DispatchError>;

/// Instrumentation for one method
#[derive(Debug, Clone)]
pub struct Lifecycle {
    method: String,
    event: String,
    phases: Phases,
    include_args: bool,
    include_result: bool,
}

impl Lifecycle {
    /// Events are named after `method` unless [`event`](Self::event) says
    /// otherwise
    pub fn new(method: impl Into<String>, phases: Phases) -> Self {
        let method = method.into();
        Self {
            event: method.clone(),
            method,
            phases,
            include_args: true,
            include_result: true,
        }
    }

    /// Base name for the fired events
    pub fn event(mut self, name: impl Into<String>) -> Self {
        self.event = name.into();
        self
    }

    /// Leave the call's arguments out of event parameters
    pub fn without_args(mut self) -> Self {
        self.include_args = false;
        self
    }

    /// Leave the call's result out of AFTER and FINALLY parameters
    pub fn without_result(mut self) -> Self {
        self.include_result = false;
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn phases(&self) -> Phases {
        self.phases
    }

    /// Full event name for a phase suffix, e.g. `fetch:before`
    pub fn event_name(&self, phase: &str) -> String {
        format!("{}:{}", self.event, phase)
    }

    /// Run an async `body` inside the lifecycle events of `target`'s sink
    pub async fn call<S, A, T, E, F, Fut>(&self, target: &S, args: &A, body: F) -> Result<T, E>
    where
        S: Instrumented + ?Sized,
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        E: From<DispatchError> + Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !<S::Sink as Dispatch>::LIVE {
            return body().await;
        }
        let sink = target.sink();
        let args = self.args(args);
        let span = tracing::debug_span!("relay.lifecycle", method = %self.method, event = %self.event);

        async move {
            let start = Instant::now();

            let substituted = if self.phases.contains(Phases::BEFORE) {
                let name = self.event_name(names::BEFORE);
                let dispatched = sink.dispatch(&name, self.params(&args, None, None)).await;
                self.substitute(&name, dispatched)
            } else {
                Ok(None)
            };

            let outcome = match substituted {
                Err(e) => Err(e),
                Ok(Some(value)) => Ok(value),
                Ok(None) => match body().await {
                    Ok(value) if self.phases.contains(Phases::AFTER) => {
                        let name = self.event_name(names::AFTER);
                        let params = self.params(&args, self.result_value(&value), None);
                        let dispatched = sink.dispatch(&name, params).await;
                        self.transform(&name, dispatched, value)
                    }
                    Err(e) if self.phases.contains(Phases::ERROR) => {
                        let name = self.event_name(names::ERROR);
                        let params = self.params(&args, None, Some(e.to_string()));
                        let dispatched = sink.dispatch(&name, params).await;
                        self.recover(&name, dispatched, e)
                    }
                    other => other,
                },
            };

            if self.phases.contains(Phases::FINALLY) {
                let name = self.event_name(names::FINALLY);
                let dispatched = sink.dispatch(&name, self.final_params(&args, &outcome)).await;
                observe(&name, dispatched);
            }

            log_outcome(&outcome, start);
            outcome
        }
        .instrument(span)
        .await
    }

    /// Blocking form of [`call`](Self::call) for a synchronous `body`
    pub fn call_sync<S, A, T, E, F>(&self, target: &S, args: &A, body: F) -> Result<T, E>
    where
        S: Instrumented + ?Sized,
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        E: From<DispatchError> + Display,
        F: FnOnce() -> Result<T, E>,
    {
        if !<S::Sink as Dispatch>::LIVE {
            return body();
        }
        let sink = target.sink();
        let args = self.args(args);
        let span = tracing::debug_span!("relay.lifecycle", method = %self.method, event = %self.event);
        let _guard = span.enter();
        let start = Instant::now();

        let substituted = if self.phases.contains(Phases::BEFORE) {
            let name = self.event_name(names::BEFORE);
            let dispatched = sink.dispatch_sync(&name, self.params(&args, None, None));
            self.substitute(&name, dispatched)
        } else {
            Ok(None)
        };

        let outcome = match substituted {
            Err(e) => Err(e),
            Ok(Some(value)) => Ok(value),
            Ok(None) => match body() {
                Ok(value) if self.phases.contains(Phases::AFTER) => {
                    let name = self.event_name(names::AFTER);
                    let params = self.params(&args, self.result_value(&value), None);
                    let dispatched = sink.dispatch_sync(&name, params);
                    self.transform(&name, dispatched, value)
                }
                Err(e) if self.phases.contains(Phases::ERROR) => {
                    let name = self.event_name(names::ERROR);
                    let params = self.params(&args, None, Some(e.to_string()));
                    let dispatched = sink.dispatch_sync(&name, params);
                    self.recover(&name, dispatched, e)
                }
                other => other,
            },
        };

        if self.phases.contains(Phases::FINALLY) {
            let name = self.event_name(names::FINALLY);
            let dispatched = sink.dispatch_sync(&name, self.final_params(&args, &outcome));
            observe(&name, dispatched);
        }

        log_outcome(&outcome, start);
        outcome
    }

    // -------------------------------------------------------------------------
    // Phase outcomes
    // -------------------------------------------------------------------------

    /// BEFORE: any output set by a handler replaces the body
    fn substitute<T, E>(&self, name: &str, dispatched: Dispatched) -> Result<Option<T>, E>
    where
        T: DeserializeOwned,
        E: From<DispatchError>,
    {
        let Some(mut ctx) = dispatched? else {
            return Ok(None);
        };
        if let Some(rejected) = rejection(name, &ctx) {
            return Err(rejected.into());
        }
        match ctx.take_output() {
            Some(output) => {
                tracing::debug!(event = name, "result substituted, skipping body");
                Ok(Some(convert(name, output)?))
            }
            None => Ok(None),
        }
    }

    /// AFTER: a stop with output replaces the result
    fn transform<T, E>(&self, name: &str, dispatched: Dispatched, value: T) -> Result<T, E>
    where
        T: DeserializeOwned,
        E: From<DispatchError>,
    {
        let Some(mut ctx) = dispatched? else {
            return Ok(value);
        };
        if let Some(rejected) = rejection(name, &ctx) {
            return Err(rejected.into());
        }
        if !ctx.is_stopped() {
            return Ok(value);
        }
        match ctx.take_output() {
            Some(output) => {
                tracing::debug!(event = name, "result replaced");
                Ok(convert(name, output)?)
            }
            None => Ok(value),
        }
    }

    /// ERROR: a stop with output recovers; anything else keeps `error`
    fn recover<T, E>(&self, name: &str, dispatched: Dispatched, error: E) -> Result<T, E>
    where
        T: DeserializeOwned,
        E: From<DispatchError>,
    {
        let mut ctx = match dispatched {
            Ok(Some(ctx)) => ctx,
            Ok(None) => return Err(error),
            Err(e) => {
                tracing::warn!(event = name, error = %e, "error handlers failed, keeping original error");
                return Err(error);
            }
        };
        if let Some(rejected) = rejection(name, &ctx) {
            return Err(rejected.into());
        }
        if !ctx.is_stopped() {
            return Err(error);
        }
        match ctx.take_output() {
            Some(output) => {
                tracing::debug!(event = name, "error recovered");
                Ok(convert(name, output)?)
            }
            None => Err(error),
        }
    }

    // -------------------------------------------------------------------------
    // Parameters
    // -------------------------------------------------------------------------

    fn args<A: Serialize + ?Sized>(&self, args: &A) -> Map<String, Value> {
        if !self.include_args {
            return Map::new();
        }
        match serde_json::to_value(args) {
            Ok(Value::Object(map)) => map,
            Ok(Value::Null) => Map::new(),
            Ok(value) => {
                let mut map = Map::new();
                map.insert("value".to_string(), value);
                map
            }
            Err(e) => {
                tracing::debug!(method = %self.method, error = %e, "arguments not serializable, omitted");
                Map::new()
            }
        }
    }

    fn result_value<T: Serialize>(&self, value: &T) -> Option<Value> {
        if !self.include_result {
            return None;
        }
        match serde_json::to_value(value) {
            Ok(Value::Null) => None,
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(method = %self.method, error = %e, "result not serializable, omitted");
                None
            }
        }
    }

    fn params(&self, args: &Map<String, Value>, result: Option<Value>, error: Option<String>) -> Params {
        LifecycleParams {
            args: args.clone(),
            result,
            error,
        }
        .into()
    }

    fn final_params<T: Serialize, E: Display>(
        &self,
        args: &Map<String, Value>,
        outcome: &Result<T, E>,
    ) -> Params {
        match outcome {
            Ok(value) => self.params(args, self.result_value(value), None),
            Err(e) => self.params(args, None, Some(e.to_string())),
        }
    }
}

fn rejection(name: &str, ctx: &EventContext) -> Option<DispatchError> {
    if !ctx.stopped_with_exception() {
        return None;
    }
    ctx.exception().map(|source| DispatchError::Rejected {
        event: name.to_string(),
        source: source.clone(),
    })
}

fn convert<T: DeserializeOwned>(name: &str, output: Value) -> Result<T, DispatchError> {
    serde_json::from_value(output).map_err(|source| DispatchError::Output {
        event: name.to_string(),
        source,
    })
}

/// FINALLY never changes the outcome
fn observe(name: &str, dispatched: Dispatched) {
    if let Err(e) = dispatched {
        tracing::warn!(event = name, error = %e, "finally handlers failed");
    }
}

fn log_outcome<T, E: Display>(outcome: &Result<T, E>, start: Instant) {
    let elapsed_ms = start.elapsed().as_millis() as u64;
    match outcome {
        Ok(_) => tracing::debug!(elapsed_ms, "call completed"),
        Err(e) => tracing::debug!(elapsed_ms, error = %e, "call failed"),
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
