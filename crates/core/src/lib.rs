// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! relay-core: named-event dispatch
//!
//! Handlers register on a [`Router`] under an event name with a priority and
//! an optional predicate. Firing an event runs the matching handlers in
//! priority order against a shared [`EventContext`], across any routers
//! linked by relays. Async handlers fired from synchronous code run on a
//! [`Bridge`] worker thread.

mod bridge;
mod config;
mod context;
mod error;
mod handler;
pub mod names;
mod params;
mod pattern;
mod registry;
mod router;

pub use bridge::Bridge;
pub use config::{
    BridgeConfig, ConfigError, RelayConfig, RouterConfig, UnhandledPolicy, DEFAULT_PRIORITY,
    DEFAULT_QUEUE_CAPACITY, DEFAULT_THREAD_NAME,
};
pub use context::{DispatchTrace, EventContext, RouterId};
pub use error::{BridgeError, DispatchError, HandlerError, ParamError};
pub use handler::{AsyncHandler, Handler, HandlerResult};
pub use params::{LifecycleParams, MessageParams, ModeParams, Params, ToolParams};
pub use pattern::EventPattern;
pub use registry::HandlerId;
pub use router::{Router, RouterBuilder};

// Handlers that return futures need this in scope
pub use futures::future::BoxFuture;
