// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rfarm-daemon: the render dispatch controller process (binary `rfarmd`).
//!
//! Architecture:
//! - Listener task: accepts worker connections and spawns per-connection
//!   reader/writer tasks; readers emit events onto the controller channel.
//! - Controller loop: a single task that owns the dispatcher, processes
//!   events sequentially, and executes the resulting effects. All mutable
//!   scheduling state lives here, so none of it needs a lock.

pub mod commands;
pub mod controller;
pub mod event;
pub mod listener;
pub mod rcfile;
