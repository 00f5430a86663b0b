// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event name patterns for wildcard handlers

use std::fmt;

/// Pattern over `:`-separated event names
///
/// Supports:
///   - Exact: "message:append:before"
///   - Single wildcard: "tool:call:*" matches "tool:call:before", "tool:call:error"
///   - Tail wildcard: "message:**" matches every message event
///   - `*` or `**` alone matches everything; the empty pattern matches nothing
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EventPattern(String);

impl EventPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    /// Check if this pattern matches an event name
    pub fn matches(&self, event_name: &str) -> bool {
        match self.0.as_str() {
            "" => false,
            "*" | "**" => true,
            pattern => {
                let pattern: Vec<&str> = pattern.split(':').collect();
                let event: Vec<&str> = event_name.split(':').collect();
                segments_match(&pattern, &event)
            }
        }
    }

    /// True when the pattern has no wildcard segment
    pub fn is_exact(&self) -> bool {
        !self.0.split(':').any(|s| s == "*" || s == "**")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn segments_match(pattern: &[&str], event: &[&str]) -> bool {
    match (pattern, event) {
        ([], []) => true,
        (["**", ..], _) => true,
        ([head, pattern @ ..], [segment, event @ ..]) if *head == "*" || head == segment => {
            segments_match(pattern, event)
        }
        _ => false,
    }
}

impl fmt::Display for EventPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventPattern {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EventPattern {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
#[path = "pattern_tests.rs"]
mod tests;
