// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared scaffolding for engine tests.

use crate::dispatch::Dispatcher;
use crate::effect::Effect;
use rfarm_core::{DispatchConfig, HostName, WorkerId, WorkerState};
use rfarm_proto::Message;
use std::path::Path;

pub(crate) fn config(width: u32, height: u32) -> DispatchConfig {
    DispatchConfig {
        width,
        height,
        ..DispatchConfig::default()
    }
}

/// Dispatcher with a loaded model and the given default frame size.
pub(crate) fn dispatcher(width: u32, height: u32) -> Dispatcher {
    let mut d = Dispatcher::new(config(width, height));
    d.load_model("scene.db".into(), vec!["all".to_string()]);
    d
}

/// Register a worker and walk it straight to ready.
pub(crate) fn ready_worker(d: &mut Dispatcher, name: &str) -> WorkerId {
    let id = WorkerId::new(name);
    d.worker_connected(id.clone(), HostName::new(format!("host-{name}")));
    if let Some(worker) = d.workers.get_mut(&id) {
        worker.state = WorkerState::Ready;
    }
    id
}

/// Queue one frame with its output file under `dir`.
pub(crate) fn add_frame_in(d: &mut Dispatcher, dir: &Path, number: u32) {
    d.set_base_name(dir.join("img").display().to_string());
    assert!(d.add_frame(number, String::new()));
}

/// The `(start, stop, frame)` of every Lines message sent to `to`.
pub(crate) fn lines_sent(effects: &[Effect], to: &WorkerId) -> Vec<(u32, u32, u32)> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Send {
                to: target,
                message: Message::Lines { start, stop, frame },
            } if target == to => Some((*start, *stop, *frame)),
            _ => None,
        })
        .collect()
}

pub(crate) fn disconnects(effects: &[Effect]) -> Vec<WorkerId> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Disconnect { id, .. } => Some(id.clone()),
            _ => None,
        })
        .collect()
}
