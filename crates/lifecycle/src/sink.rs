// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Where lifecycle events go

use async_trait::async_trait;
use relay_core::{DispatchError, EventContext, Params, Router};

/// Destination for lifecycle events.
///
/// `None` means the event went nowhere; the wrapper then behaves as if no
/// handler touched the context.
#[async_trait]
pub trait Dispatch: Send + Sync {
    /// False for sinks that drop every event; the wrapper skips building
    /// parameters for them entirely
    const LIVE: bool;

    async fn dispatch(
        &self,
        event: &str,
        params: Params,
    ) -> Result<Option<EventContext>, DispatchError>;

    fn dispatch_sync(
        &self,
        event: &str,
        params: Params,
    ) -> Result<Option<EventContext>, DispatchError>;
}

#[async_trait]
impl Dispatch for Router {
    const LIVE: bool = true;

    async fn dispatch(
        &self,
        event: &str,
        params: Params,
    ) -> Result<Option<EventContext>, DispatchError> {
        self.apply(event, params).await.map(Some)
    }

    fn dispatch_sync(
        &self,
        event: &str,
        params: Params,
    ) -> Result<Option<EventContext>, DispatchError> {
        self.apply_sync(event, params).map(Some)
    }
}

/// Sink for types that do not take part in dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Detached;

#[async_trait]
impl Dispatch for Detached {
    const LIVE: bool = false;

    async fn dispatch(
        &self,
        _event: &str,
        _params: Params,
    ) -> Result<Option<EventContext>, DispatchError> {
        Ok(None)
    }

    fn dispatch_sync(
        &self,
        _event: &str,
        _params: Params,
    ) -> Result<Option<EventContext>, DispatchError> {
        Ok(None)
    }
}

/// Types whose wrapped methods report to a sink
pub trait Instrumented {
    type Sink: Dispatch;

    fn sink(&self) -> &Self::Sink;
}

impl Instrumented for Router {
    type Sink = Router;

    fn sink(&self) -> &Router {
        self
    }
}

impl Instrumented for Detached {
    type Sink = Detached;

    fn sink(&self) -> &Detached {
        self
    }
}
