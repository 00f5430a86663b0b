// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Well-known event names
//!
//! Each name documents the parameter variant its emitters send. The pairing
//! is a convention between collaborators and is not checked at dispatch.

/// Before a message joins an agent's history. Carries [`MessageParams`](crate::MessageParams).
pub const MESSAGE_APPEND_BEFORE: &str = "message:append:before";
/// After a message joined an agent's history. Carries [`MessageParams`](crate::MessageParams).
pub const MESSAGE_APPEND_AFTER: &str = "message:append:after";
/// A message is being rendered for the transport. Carries [`MessageParams`](crate::MessageParams).
pub const MESSAGE_RENDER: &str = "message:render";

/// Before a tool runs. Carries [`ToolParams`](crate::ToolParams).
pub const TOOL_CALL_BEFORE: &str = "tool:call:before";
/// A tool returned. Carries [`ToolParams`](crate::ToolParams) with `result`.
pub const TOOL_CALL_AFTER: &str = "tool:call:after";
/// A tool failed. Carries [`ToolParams`](crate::ToolParams) with `error`.
pub const TOOL_CALL_ERROR: &str = "tool:call:error";

/// An agent entered a mode. Carries [`ModeParams`](crate::ModeParams).
pub const MODE_ENTER: &str = "mode:enter";
/// An agent left a mode. Carries [`ModeParams`](crate::ModeParams).
pub const MODE_EXIT: &str = "mode:exit";

/// Suffixes appended by the lifecycle wrapper
pub const BEFORE: &str = "before";
pub const AFTER: &str = "after";
pub const ERROR: &str = "error";
pub const FINALLY: &str = "finally";
