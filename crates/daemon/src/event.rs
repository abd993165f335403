// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events feeding the controller loop.

use rfarm_core::{HostName, WorkerId};
use rfarm_proto::Envelope;

/// Everything the controller loop reacts to.
#[derive(Debug)]
pub enum Event {
    /// A worker connection was accepted and registered.
    Connected { id: WorkerId, host: HostName },
    /// One decoded message from a worker.
    Message { id: WorkerId, envelope: Envelope },
    /// A worker connection ended (EOF or read error).
    Closed { id: WorkerId, reason: String },
    /// One operator command line, continuations already joined.
    Operator { line: String },
    /// Operator input ended.
    OperatorEof,
}
