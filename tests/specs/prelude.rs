// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the dispatch specs

pub use relay_core::{
    Bridge, BridgeConfig, BridgeError, DispatchError, Handler, HandlerError, Params, RelayConfig,
    Router,
};
pub use relay_lifecycle::{Detached, Instrumented, Lifecycle, Phases};
pub use serde_json::json;
pub use std::sync::{Arc, Mutex};

/// Ordered record of handler invocations, shared by every handler it makes
#[derive(Clone, Default)]
pub struct Trail(Arc<Mutex<Vec<String>>>);

impl Trail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, label: impl Into<String>) {
        self.0.lock().unwrap().push(label.into());
    }

    /// Sync handler that appends `label`
    pub fn sync(&self, label: &str) -> Handler {
        let trail = self.clone();
        let label = label.to_string();
        Handler::sync(move |_ctx| {
            trail.push(label.clone());
            Ok(())
        })
    }

    /// Async handler that yields once, then appends `label`
    pub fn future(&self, label: &str) -> Handler {
        let trail = self.clone();
        let label = label.to_string();
        Handler::future(move |_ctx| {
            let trail = trail.clone();
            let label = label.clone();
            Box::pin(async move {
                tokio::task::yield_now().await;
                trail.push(label);
                Ok(())
            })
        })
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// Router with its own bridge, so blocking specs never share a worker
pub fn isolated_router(name: &str, capacity: usize) -> Router {
    let bridge = Bridge::start(&BridgeConfig {
        queue_capacity: capacity,
        thread_name: name.to_string(),
    })
    .unwrap();
    Router::builder().name(name).bridge(bridge).build()
}
