// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handler registry
//!
//! Records are ordered by priority (descending) and registration sequence
//! (ascending). Dispatch works over a point-in-time snapshot; registering or
//! deregistering bumps the generation and empties the snapshot cache, while
//! snapshots already handed out keep their own `Arc`s. Events with no
//! handlers are never cached.

use crate::handler::Handler;
use crate::pattern::EventPattern;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// Handle returned by `on`, used to deregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub u64);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler-{}", self.0)
    }
}

/// What a record listens to
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    Exact(String),
    Pattern(EventPattern),
}

impl Target {
    fn matches(&self, event: &str) -> bool {
        match self {
            Self::Exact(name) => name == event,
            Self::Pattern(pattern) => pattern.matches(event),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(name) => f.write_str(name),
            Self::Pattern(pattern) => write!(f, "{}", pattern),
        }
    }
}

pub(crate) struct HandlerRecord {
    pub id: HandlerId,
    pub target: Target,
    pub handler: Handler,
    pub priority: i32,
    pub sequence: u64,
    removed: AtomicBool,
}

impl HandlerRecord {
    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }
}

/// Point-in-time, priority-ordered view of the handlers for one event
pub(crate) type Snapshot = Arc<[Arc<HandlerRecord>]>;

#[derive(Default)]
struct Records {
    next_id: u64,
    next_sequence: u64,
    generation: u64,
    exact: HashMap<String, Vec<Arc<HandlerRecord>>>,
    patterns: Vec<Arc<HandlerRecord>>,
    by_id: HashMap<HandlerId, Arc<HandlerRecord>>,
}

impl Records {
    fn find_duplicate(&self, target: &Target, handler: &Handler) -> Option<HandlerId> {
        let candidates = match target {
            Target::Exact(name) => self.exact.get(name).map(Vec::as_slice).unwrap_or(&[]),
            Target::Pattern(_) => self.patterns.as_slice(),
        };
        candidates
            .iter()
            .find(|r| !r.is_removed() && r.target == *target && r.handler.same_callback(handler))
            .map(|r| r.id)
    }
}

#[derive(Default)]
pub(crate) struct Registry {
    records: RwLock<Records>,
    cache: Mutex<HashMap<String, (u64, Snapshot)>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler; returns the existing id when the same callback is
    /// already registered for the same target
    pub fn insert(&self, target: Target, handler: Handler, default_priority: i32) -> HandlerId {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());

        if let Some(id) = records.find_duplicate(&target, &handler) {
            tracing::debug!(%target, handler = %id, "handler already registered");
            return id;
        }

        records.next_id += 1;
        records.next_sequence += 1;
        let id = HandlerId(records.next_id);
        let record = Arc::new(HandlerRecord {
            id,
            priority: handler.priority.unwrap_or(default_priority),
            sequence: records.next_sequence,
            target: target.clone(),
            handler,
            removed: AtomicBool::new(false),
        });

        match &target {
            Target::Exact(name) => records
                .exact
                .entry(name.clone())
                .or_default()
                .push(Arc::clone(&record)),
            Target::Pattern(_) => records.patterns.push(Arc::clone(&record)),
        }
        records.by_id.insert(id, Arc::clone(&record));
        records.generation += 1;
        self.evict();

        tracing::debug!(%target, handler = %id, priority = record.priority, "handler registered");
        id
    }

    /// Tombstone and unlink a handler. Returns false for unknown ids.
    pub fn remove(&self, id: HandlerId) -> bool {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());

        let Some(record) = records.by_id.remove(&id) else {
            return false;
        };
        record.removed.store(true, Ordering::Release);

        match &record.target {
            Target::Exact(name) => {
                let emptied = match records.exact.get_mut(name) {
                    Some(list) => {
                        list.retain(|r| !r.is_removed());
                        list.is_empty()
                    }
                    None => false,
                };
                if emptied {
                    records.exact.remove(name);
                }
            }
            Target::Pattern(_) => records.patterns.retain(|r| !r.is_removed()),
        }
        records.generation += 1;
        self.evict();

        tracing::debug!(target = %record.target, handler = %id, "handler deregistered");
        true
    }

    /// Ordered handlers for `event` as of now
    pub fn snapshot(&self, event: &str) -> Snapshot {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());

        if let Some((generation, snapshot)) = cache.get(event) {
            if *generation == records.generation {
                return Arc::clone(snapshot);
            }
        }

        let mut matched: Vec<Arc<HandlerRecord>> = records
            .exact
            .get(event)
            .into_iter()
            .flatten()
            .chain(records.patterns.iter().filter(|r| r.target.matches(event)))
            .filter(|r| !r.is_removed())
            .cloned()
            .collect();
        matched.sort_by_key(|r| (Reverse(r.priority), r.sequence));

        let snapshot: Snapshot = matched.into();
        if !snapshot.is_empty() {
            cache.insert(event.to_string(), (records.generation, Arc::clone(&snapshot)));
        }
        snapshot
    }

    /// Drop every cached snapshot; called with the records lock held
    fn evict(&self) {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn contains(&self, id: HandlerId) -> bool {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .by_id
            .contains_key(&id)
    }

    /// Number of live handlers across all events
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .by_id
            .len()
    }

    /// Current generation; advances on every registry mutation
    #[cfg(test)]
    pub fn generation(&self) -> u64 {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .generation
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
