// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sync/async bridge
//!
//! A dedicated worker thread drives a single-threaded tokio runtime. Work
//! reaches it over a bounded queue, so futures submitted from synchronous
//! call sites run cooperatively with each other and can be waited on from
//! any thread except the worker itself.

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use futures::future::BoxFuture;
use std::any::Any;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle, ThreadId};
use tokio::sync::{mpsc, oneshot};

static SHARED: Mutex<Option<Arc<Bridge>>> = Mutex::new(None);

struct Job {
    task: BoxFuture<'static, ()>,
}

/// Why a submitted future produced no value
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TaskFault {
    Panicked(String),
    /// The worker shut down before the future finished
    Cancelled,
}

/// Pending result of a future running on the bridge
pub(crate) struct Completion<T> {
    rx: oneshot::Receiver<Result<T, TaskFault>>,
}

impl<T> Completion<T> {
    pub async fn wait(self) -> Result<T, TaskFault> {
        self.rx.await.unwrap_or(Err(TaskFault::Cancelled))
    }
}

pub struct Bridge {
    tx: Option<mpsc::Sender<Job>>,
    worker: ThreadId,
    thread: Option<JoinHandle<()>>,
}

impl Bridge {
    /// Start a dedicated bridge with its own worker thread
    pub fn start(config: &BridgeConfig) -> Result<Arc<Self>, BridgeError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let (tx, mut rx) = mpsc::channel::<Job>(config.queue_capacity.max(1));

        let thread = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || {
                runtime.block_on(async move {
                    while let Some(job) = rx.recv().await {
                        tokio::spawn(job.task);
                    }
                });
                tracing::debug!("bridge queue closed, worker exiting");
            })?;

        let worker = thread.thread().id();
        tracing::debug!(
            thread = %config.thread_name,
            capacity = config.queue_capacity,
            "bridge worker started"
        );

        Ok(Arc::new(Self {
            tx: Some(tx),
            worker,
            thread: Some(thread),
        }))
    }

    /// Process-wide bridge, started on first use
    pub fn shared() -> Result<Arc<Self>, BridgeError> {
        let mut slot = SHARED.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(bridge) = slot.as_ref() {
            return Ok(Arc::clone(bridge));
        }
        let bridge = Self::start(&BridgeConfig::default())?;
        *slot = Some(Arc::clone(&bridge));
        Ok(bridge)
    }

    /// True when called from this bridge's worker thread
    pub fn is_worker_thread(&self) -> bool {
        thread::current().id() == self.worker
    }

    /// Fail instead of blocking the worker on its own work
    pub fn ensure_off_worker(&self) -> Result<(), BridgeError> {
        if self.is_worker_thread() {
            tracing::error!("blocking dispatch call issued from the bridge worker thread");
            return Err(BridgeError::Reentrant);
        }
        Ok(())
    }

    /// Block the calling thread on `fut`; never allowed on the worker
    pub fn block_on<F: Future>(&self, fut: F) -> Result<F::Output, BridgeError> {
        self.ensure_off_worker()?;
        Ok(futures::executor::block_on(fut))
    }

    /// Queue `fut` without waiting for room; fails when the queue is full
    pub(crate) fn try_spawn<T, F>(&self, fut: F) -> Result<Completion<T>, BridgeError>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let tx = self.tx.as_ref().ok_or(BridgeError::Closed)?;
        let (job, completion) = Self::job(fut);
        tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => BridgeError::Saturated,
            mpsc::error::TrySendError::Closed(_) => BridgeError::Closed,
        })?;
        Ok(completion)
    }

    /// Queue `fut`, waiting for room in the queue
    pub(crate) async fn spawn<T, F>(&self, fut: F) -> Result<Completion<T>, BridgeError>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let tx = self.tx.as_ref().ok_or(BridgeError::Closed)?;
        let (job, completion) = Self::job(fut);
        tx.send(job).await.map_err(|_| BridgeError::Closed)?;
        Ok(completion)
    }

    fn job<T, F>(fut: F) -> (Job, Completion<T>)
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        let task = Box::pin(async move {
            let outcome = match tokio::spawn(fut).await {
                Ok(value) => Ok(value),
                Err(e) if e.is_panic() => Err(TaskFault::Panicked(panic_message(e.into_panic()))),
                Err(_) => Err(TaskFault::Cancelled),
            };
            let _ = reply.send(outcome);
        });
        (Job { task }, Completion { rx })
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        // Closing the queue ends the worker loop
        self.tx.take();

        let Some(thread) = self.thread.take() else {
            return;
        };
        if self.is_worker_thread() {
            // Last handle released by a task on the worker; it exits on its own
            return;
        }
        if thread.join().is_err() {
            tracing::warn!("bridge worker panicked during shutdown");
        }
    }
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
#[path = "bridge_tests.rs"]
mod tests;
