// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event parameters
//!
//! Well-known events carry a typed parameter struct; user-defined events use
//! a string-keyed map. Generic handlers can still read and write any variant
//! by key through [`Params::get`] and [`Params::set`].

use crate::error::ParamError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameters for `message:*` events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageParams {
    pub agent: String,
    pub message: Value,
}

/// Parameters for `tool:call:*` events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolParams {
    pub agent: String,
    pub tool: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Parameters for `mode:enter` and `mode:exit`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModeParams {
    pub agent: String,
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
}

/// Parameters produced by the lifecycle wrapper around a method call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifecycleParams {
    #[serde(default)]
    pub args: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Parameter bag carried by an [`EventContext`](crate::EventContext)
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    Message(MessageParams),
    Tool(ToolParams),
    Mode(ModeParams),
    Lifecycle(LifecycleParams),
    Custom(Map<String, Value>),
}

impl Default for Params {
    fn default() -> Self {
        Self::Custom(Map::new())
    }
}

impl Params {
    /// Empty ad hoc parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Variant name, used in errors and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::Tool(_) => "tool",
            Self::Mode(_) => "mode",
            Self::Lifecycle(_) => "lifecycle",
            Self::Custom(_) => "custom",
        }
    }

    /// Builder-style insert for ad hoc parameters.
    ///
    /// Typed variants only accept their own fields; a rejected key is logged
    /// and the parameters are returned unchanged.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if let Err(e) = self.set(&key, value.into()) {
            tracing::debug!(key, error = %e, "ignoring parameter");
        }
        self
    }

    /// Read a parameter by key
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Self::Message(p) => match key {
                "agent" => Some(Value::String(p.agent.clone())),
                "message" => Some(p.message.clone()),
                _ => None,
            },
            Self::Tool(p) => match key {
                "agent" => Some(Value::String(p.agent.clone())),
                "tool" => Some(Value::String(p.tool.clone())),
                "arguments" => Some(Value::Object(p.arguments.clone())),
                "result" => p.result.clone(),
                "error" => p.error.clone().map(Value::String),
                _ => None,
            },
            Self::Mode(p) => match key {
                "agent" => Some(Value::String(p.agent.clone())),
                "mode" => Some(Value::String(p.mode.clone())),
                "previous" => p.previous.clone().map(Value::String),
                _ => None,
            },
            Self::Lifecycle(p) => match key {
                "args" => Some(Value::Object(p.args.clone())),
                "result" => p.result.clone(),
                "error" => p.error.clone().map(Value::String),
                _ => None,
            },
            Self::Custom(map) => map.get(key).cloned(),
        }
    }

    /// Read a parameter and convert it to `T`
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ParamError> {
        self.get(key)
            .map(|v| convert(key, v))
            .transpose()
    }

    /// Write a parameter by key
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), ParamError> {
        let variant = self.kind();
        let unknown = || ParamError::UnknownField {
            variant,
            key: key.to_string(),
        };
        match self {
            Self::Message(p) => match key {
                "agent" => p.agent = convert(key, value)?,
                "message" => p.message = value,
                _ => return Err(unknown()),
            },
            Self::Tool(p) => match key {
                "agent" => p.agent = convert(key, value)?,
                "tool" => p.tool = convert(key, value)?,
                "arguments" => p.arguments = convert(key, value)?,
                "result" => p.result = non_null(value),
                "error" => p.error = convert(key, value)?,
                _ => return Err(unknown()),
            },
            Self::Mode(p) => match key {
                "agent" => p.agent = convert(key, value)?,
                "mode" => p.mode = convert(key, value)?,
                "previous" => p.previous = convert(key, value)?,
                _ => return Err(unknown()),
            },
            Self::Lifecycle(p) => match key {
                "args" => p.args = convert(key, value)?,
                "result" => p.result = non_null(value),
                "error" => p.error = convert(key, value)?,
                _ => return Err(unknown()),
            },
            Self::Custom(map) => {
                map.insert(key.to_string(), value);
            }
        }
        Ok(())
    }

    /// Remove a parameter.
    ///
    /// Optional fields of typed variants are cleared; required fields cannot
    /// be removed and yield `None`.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        match self {
            Self::Tool(p) => match key {
                "result" => p.result.take(),
                "error" => p.error.take().map(Value::String),
                _ => None,
            },
            Self::Mode(p) if key == "previous" => p.previous.take().map(Value::String),
            Self::Lifecycle(p) => match key {
                "result" => p.result.take(),
                "error" => p.error.take().map(Value::String),
                _ => None,
            },
            Self::Custom(map) => map.remove(key),
            _ => None,
        }
    }

    /// Keys currently holding a value
    pub fn keys(&self) -> Vec<String> {
        self.to_map().keys().cloned().collect()
    }

    /// Flatten into a string-keyed map
    pub fn to_map(&self) -> Map<String, Value> {
        let value = match self {
            Self::Message(p) => serde_json::to_value(p),
            Self::Tool(p) => serde_json::to_value(p),
            Self::Mode(p) => serde_json::to_value(p),
            Self::Lifecycle(p) => serde_json::to_value(p),
            Self::Custom(map) => return map.clone(),
        };
        match value {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    pub fn as_message(&self) -> Option<&MessageParams> {
        match self {
            Self::Message(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_message_mut(&mut self) -> Option<&mut MessageParams> {
        match self {
            Self::Message(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_tool(&self) -> Option<&ToolParams> {
        match self {
            Self::Tool(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_tool_mut(&mut self) -> Option<&mut ToolParams> {
        match self {
            Self::Tool(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_mode(&self) -> Option<&ModeParams> {
        match self {
            Self::Mode(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_lifecycle(&self) -> Option<&LifecycleParams> {
        match self {
            Self::Lifecycle(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_lifecycle_mut(&mut self) -> Option<&mut LifecycleParams> {
        match self {
            Self::Lifecycle(p) => Some(p),
            _ => None,
        }
    }
}

fn convert<T: DeserializeOwned>(key: &str, value: Value) -> Result<T, ParamError> {
    serde_json::from_value(value).map_err(|source| ParamError::Type {
        key: key.to_string(),
        source,
    })
}

fn non_null(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        v => Some(v),
    }
}

impl From<MessageParams> for Params {
    fn from(p: MessageParams) -> Self {
        Self::Message(p)
    }
}

impl From<ToolParams> for Params {
    fn from(p: ToolParams) -> Self {
        Self::Tool(p)
    }
}

impl From<ModeParams> for Params {
    fn from(p: ModeParams) -> Self {
        Self::Mode(p)
    }
}

impl From<LifecycleParams> for Params {
    fn from(p: LifecycleParams) -> Self {
        Self::Lifecycle(p)
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Self::Custom(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::Custom(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
#[path = "params_tests.rs"]
mod tests;
