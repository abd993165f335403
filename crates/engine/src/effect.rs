// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Side effects the dispatcher asks the daemon to perform.

use rfarm_adapters::LaunchRequest;
use rfarm_core::WorkerId;
use rfarm_proto::Message;

/// Network and process effects produced by dispatch passes.
///
/// Sends are plain enqueue requests; the daemon drains them onto
/// per-connection outbound channels, so no send can recursively trigger
/// another dispatch pass.
#[derive(Debug)]
pub enum Effect {
    /// Queue a control message to one worker.
    Send { to: WorkerId, message: Message },
    /// Close a worker's connection.
    Disconnect { id: WorkerId, reason: String },
    /// Ask the launcher to start a worker on a host.
    Launch { request: LaunchRequest },
    /// Mirror a completed span to the attached framebuffer.
    MirrorSpan { offset: u32, rgb: Vec<u8> },
    /// Execute an operator-style command received from a worker, then drop
    /// that worker.
    RunCommand { from: WorkerId, line: String },
    /// The batch run finished; the process should exit.
    Shutdown,
}
