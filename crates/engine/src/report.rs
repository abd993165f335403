// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator status reports.

use crate::dispatch::Dispatcher;
use std::fmt::Write as _;

impl Dispatcher {
    /// One line per active frame.
    pub fn frame_report(&self) -> String {
        let mut text = String::new();
        let _ = writeln!(
            text,
            "{:>6} {:<12} {:>7} {:>10} {:>12} {:>8}  file",
            "frame", "state", "ranges", "pixels", "rays", "cpu-sec"
        );
        for frame in &self.frames {
            let _ = writeln!(
                text,
                "{:>6} {:<12} {:>7} {:>10} {:>12} {:>8.1}  {}",
                frame.number,
                frame.state.to_string(),
                frame.todo.len(),
                frame.todo.pixels(),
                frame.rays_fired,
                frame.cpu_seconds,
                frame
                    .filename
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            );
        }
        if self.frames.is_empty() {
            let _ = writeln!(text, "(no frames queued)");
        }
        text
    }

    /// One line per connected worker.
    pub fn worker_report(&self) -> String {
        let mut text = String::new();
        let _ = writeln!(
            text,
            "{:<8} {:<16} {:<11} {:>6} {:>10} {:>10} {:>8} {:>7}",
            "id", "host", "state", "work", "last-px/s", "avg-px/s", "avg-cpu", "samples"
        );
        for worker in self.workers.values() {
            let _ = writeln!(
                text,
                "{:<8} {:<16} {:<11} {:>6} {:>10.1} {:>10.1} {:>8.1} {:>7}",
                worker.id.short(),
                worker.host.to_string(),
                worker.state.to_string(),
                worker.in_flight_count(),
                worker.stats.weighted_rate,
                worker.stats.mean_rate(),
                worker.stats.mean_cpu(),
                worker.stats.samples
            );
        }
        if self.workers.is_empty() {
            let _ = writeln!(text, "(no workers connected)");
        }
        text
    }

    /// One line per registered host.
    pub fn host_report(&self) -> String {
        let mut text = String::new();
        let _ = writeln!(
            text,
            "{:<16} {:<8} {:<8}  directory",
            "host", "when", "db"
        );
        for host in self.hosts.iter() {
            let _ = writeln!(
                text,
                "{:<16} {:<8} {:<8}  {}",
                host.name.to_string(),
                host.policy.to_string(),
                host.provisioning.to_string(),
                host.remote_dir.display()
            );
        }
        if self.hosts.is_empty() {
            let _ = writeln!(text, "(no hosts registered)");
        }
        text
    }
}
