// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! relay-lifecycle: before/after/error/finally events around method calls

mod lifecycle;
mod sink;

pub use lifecycle::{Lifecycle, Phases};
pub use sink::{Detached, Dispatch, Instrumented};
