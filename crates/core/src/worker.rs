// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker connection records and state machine data.

use crate::host::HostName;
use crate::range::{WorkQueue, WorkRange};
use crate::stats::ThroughputStats;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

/// Connection-scoped worker identifier.
///
/// Decoupled from any OS descriptor: allocated when the connection is
/// accepted and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(String);

impl WorkerId {
    /// Allocate a fresh id.
    pub fn fresh() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Truncated form for log lines.
    pub fn short(&self) -> &str {
        if self.0.len() <= 8 {
            &self.0
        } else {
            &self.0[..8]
        }
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Connected, protocol version not yet confirmed.
    New,
    /// Version handshake passed.
    VersionOk,
    /// Model push sent, awaiting the ready ack.
    Loading,
    /// Accepting scanline assignments.
    Ready,
    /// Told to restart; the far end closes the connection itself.
    Restarting,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::New => write!(f, "new"),
            WorkerState::VersionOk => write!(f, "version-ok"),
            WorkerState::Loading => write!(f, "loading"),
            WorkerState::Ready => write!(f, "ready"),
            WorkerState::Restarting => write!(f, "restarting"),
        }
    }
}

/// One remote rendering process.
#[derive(Debug)]
pub struct Worker {
    pub id: WorkerId,
    pub host: HostName,
    pub state: WorkerState,
    /// Outstanding assignments, keyed by frame number.
    in_flight: BTreeMap<u32, WorkQueue>,
    /// When the most recent assignment was sent.
    pub last_send: Option<Instant>,
    pub stats: ThroughputStats,
}

impl Worker {
    pub fn new(id: WorkerId, host: HostName) -> Self {
        Self {
            id,
            host,
            state: WorkerState::New,
            in_flight: BTreeMap::new(),
            last_send: None,
            stats: ThroughputStats::default(),
        }
    }

    /// Total outstanding assignments across all frames.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.values().map(WorkQueue::len).sum()
    }

    pub fn has_work(&self) -> bool {
        self.in_flight_count() > 0
    }

    pub fn has_work_for(&self, frame: u32) -> bool {
        self.in_flight.get(&frame).is_some_and(|q| !q.is_empty())
    }

    /// Record a new assignment and stamp the send time.
    pub fn assign(&mut self, frame: u32, range: WorkRange, now: Instant) {
        self.in_flight.entry(frame).or_default().push_back(range);
        self.last_send = Some(now);
    }

    /// Clear a completed sub-range from this worker's in-flight record.
    ///
    /// Returns `false` when the worker holds no assignment covering the
    /// sub-range for that frame.
    pub fn complete(&mut self, frame: u32, a: u32, b: u32) -> bool {
        let Some(queue) = self.in_flight.get_mut(&frame) else {
            return false;
        };
        let matched = queue.remove_completed(a, b);
        if queue.is_empty() {
            self.in_flight.remove(&frame);
        }
        matched
    }

    /// Give up all in-flight work, e.g. when the connection drops.
    pub fn surrender(&mut self) -> BTreeMap<u32, WorkQueue> {
        std::mem::take(&mut self.in_flight)
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
