// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for dispatch, handlers and the bridge

use crate::registry::HandlerId;
use thiserror::Error;

/// Error raised by a handler or predicate.
///
/// Cloneable so a context can keep the exception it was stopped with while
/// the same value is reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),
    /// Deliberate abort of the remaining handler chain
    #[error("interrupted: {0}")]
    Interrupted(String),
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    pub fn failed(message: impl std::fmt::Display) -> Self {
        Self::Failed(message.to_string())
    }

    pub fn interrupt(reason: impl std::fmt::Display) -> Self {
        Self::Interrupted(reason.to_string())
    }

    pub fn is_interrupt(&self) -> bool {
        matches!(self, Self::Interrupted(_))
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Failed(e.to_string())
    }
}

impl From<ParamError> for HandlerError {
    fn from(e: ParamError) -> Self {
        Self::Failed(e.to_string())
    }
}

/// Errors surfaced by `apply`, `apply_sync`, `emit` and `join`
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("handler {handler} failed on {event}: {source}")]
    Handler {
        event: String,
        handler: HandlerId,
        #[source]
        source: HandlerError,
    },
    #[error("dispatch of {event} interrupted: {reason}")]
    Interrupted { event: String, reason: String },
    /// A background dispatch died without reporting which handler failed
    #[error("dispatch of {event} panicked: {message}")]
    Panicked { event: String, message: String },
    /// A handler stopped the chain with an exception the caller chose to raise
    #[error("{event} rejected by handler: {source}")]
    Rejected {
        event: String,
        #[source]
        source: HandlerError,
    },
    #[error("bridge error: {0}")]
    Bridge(#[from] BridgeError),
    #[error("output of {event} does not fit the caller's type: {source}")]
    Output {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

impl DispatchError {
    /// Wrap a handler failure, keeping interrupts distinct from faults
    pub(crate) fn from_handler(event: &str, handler: HandlerId, error: HandlerError) -> Self {
        match error {
            HandlerError::Interrupted(reason) => Self::Interrupted {
                event: event.to_string(),
                reason,
            },
            source => Self::Handler {
                event: event.to_string(),
                handler,
                source,
            },
        }
    }

    /// The handler error behind this dispatch failure, if any
    pub fn handler_error(&self) -> Option<&HandlerError> {
        match self {
            Self::Handler { source, .. } | Self::Rejected { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors from the sync/async bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A blocking call was made from the bridge's own worker thread
    #[error("blocking call issued from the bridge worker thread would deadlock")]
    Reentrant,
    #[error("bridge queue is full")]
    Saturated,
    #[error("bridge worker has shut down")]
    Closed,
    #[error("failed to start bridge worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Errors from key-level parameter access
#[derive(Debug, Error)]
pub enum ParamError {
    #[error("{variant} parameters have no field {key:?}")]
    UnknownField { variant: &'static str, key: String },
    #[error("invalid value for {key:?}: {source}")]
    Type {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}
