// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dispatcher: frames, workers, and the assignment algorithm.

use crate::effect::Effect;
use crate::hosts::HostRegistry;
use crate::output;
use indexmap::IndexMap;
use rfarm_core::{
    format_elapsed, DispatchConfig, Frame, FrameState, HostName, Provisioning, Worker, WorkerId,
    WorkerState,
};
use rfarm_proto::Message;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The database and object set workers render from.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub db_path: PathBuf,
    pub objects: Vec<String>,
}

/// Result of offering one worker work from one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The worker cannot take work right now.
    NotHungry,
    /// The frame has nothing left to hand out; advance to the next frame.
    FrameDrained,
    /// One lump assigned; `hungry` means the worker's pipe is still short.
    Assigned { hungry: bool },
    /// The frame was invalid and has been destroyed; restart the pass.
    FrameInvalid,
}

/// Owns all scheduling state and implements the assignment algorithm.
///
/// Single writer: only the daemon's event loop calls into this, so no field
/// needs a lock. The `scheduling` flag is kept as a belt-and-braces guard
/// against nested passes.
pub struct Dispatcher {
    pub(crate) config: DispatchConfig,
    pub(crate) frames: Vec<Frame>,
    /// Workers in registration order; offers follow this order.
    pub(crate) workers: IndexMap<WorkerId, Worker>,
    pub(crate) hosts: HostRegistry,
    pub(crate) model: Option<ModelSpec>,
    pub(crate) running: bool,
    pub(crate) detached: bool,
    /// Forward worker PRINT messages to the log.
    pub(crate) worker_logging: bool,
    /// Mirror completed spans to the framebuffer.
    pub(crate) fb_attached: bool,
    pub(crate) base_name: Option<String>,
    scheduling: bool,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            frames: Vec::new(),
            workers: IndexMap::new(),
            hosts: HostRegistry::new(),
            model: None,
            running: false,
            detached: false,
            worker_logging: true,
            fb_attached: false,
            base_name: None,
            scheduling: false,
        }
    }

    // --- accessors ---

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn model(&self) -> Option<&ModelSpec> {
        self.model.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn workers(&self) -> impl Iterator<Item = &Worker> {
        self.workers.values()
    }

    pub fn worker(&self, id: &WorkerId) -> Option<&Worker> {
        self.workers.get(id)
    }

    pub fn hosts(&self) -> &HostRegistry {
        &self.hosts
    }

    pub fn hosts_mut(&mut self) -> &mut HostRegistry {
        &mut self.hosts
    }

    pub fn fb_attached(&self) -> bool {
        self.fb_attached
    }

    pub fn set_fb_attached(&mut self, attached: bool) {
        self.fb_attached = attached;
    }

    // --- operator operations ---

    /// Load (or replace) the model workers render from.
    pub fn load_model(&mut self, db_path: PathBuf, objects: Vec<String>) {
        if self.model.is_some() {
            warn!("replacing loaded model; connected workers keep the old one until restarted");
        }
        info!(db = %db_path.display(), objects = objects.len(), "model loaded");
        self.model = Some(ModelSpec { db_path, objects });
    }

    /// Set the base name for output files (`<base>.<frame>`).
    pub fn set_base_name(&mut self, base: String) {
        self.base_name = Some(base);
    }

    /// Queue a frame for rendering.
    ///
    /// Returns `false` when the output file cannot be prepared; the frame is
    /// skipped and everything else proceeds.
    pub fn add_frame(&mut self, number: u32, script: String) -> bool {
        let (width, height) =
            frame_size_from_script(&script, (self.config.width, self.config.height));
        let mut frame = Frame::new(number, width, height, script);
        if let Err(e) = output::prepare(&mut frame, self.base_name.as_deref()) {
            warn!(frame = number, error = %e, "skipping frame");
            return false;
        }
        info!(frame = number, width, height, "frame queued");
        self.frames.push(frame);
        true
    }

    /// Start handing out work.
    pub fn go(&mut self) {
        if self.frames.is_empty() {
            warn!("go with no frames queued");
        }
        self.running = true;
    }

    /// Stop new assignment; in-flight work still completes.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Discard every frame without finalizing output files.
    ///
    /// Workers keep their in-flight records: stale results for a gone frame
    /// are consumed and discarded as they arrive, rather than treated as
    /// protocol violations.
    pub fn reset(&mut self) {
        self.running = false;
        for frame in self.frames.drain(..) {
            info!(frame = frame.number, "discarding frame");
        }
    }

    /// Run in batch mode: exit the process once all work drains.
    pub fn set_detached(&mut self) {
        self.detached = true;
    }

    /// Send render-option sub-commands to every connected worker.
    pub fn broadcast_options(&mut self, opts: String) -> Vec<Effect> {
        self.workers
            .keys()
            .map(|id| Effect::Send {
                to: id.clone(),
                message: Message::Options { opts: opts.clone() },
            })
            .collect()
    }

    /// Toggle worker log forwarding, pushing the new level to every worker.
    pub fn set_worker_logging(&mut self, on: bool) -> Vec<Effect> {
        self.worker_logging = on;
        self.workers
            .keys()
            .map(|id| Effect::Send {
                to: id.clone(),
                message: Message::LogLevel { verbose: on },
            })
            .collect()
    }

    pub fn worker_logging(&self) -> bool {
        self.worker_logging
    }

    // --- connection lifecycle ---

    /// Register a freshly accepted connection.
    pub fn worker_connected(&mut self, id: WorkerId, host: HostName) {
        self.hosts.resolve(&host);
        info!(worker = id.short(), host = %host, "worker connected");
        self.workers.insert(id.clone(), Worker::new(id, host));
    }

    /// The connection ended (EOF or read error); requeue its work.
    pub fn worker_closed(&mut self, id: &WorkerId) {
        self.remove_and_requeue(id);
    }

    /// Deliberately drop a worker; the returned effects close its
    /// connection.
    pub fn disconnect_worker(&mut self, id: &WorkerId, reason: &str) -> Vec<Effect> {
        let mut out = Vec::new();
        self.drop_worker(id.clone(), reason, &mut out);
        out
    }

    /// Drop every worker connected from a host.
    pub fn drop_host(&mut self, host: &HostName) -> Vec<Effect> {
        let mut out = Vec::new();
        for id in self.worker_ids_on(host) {
            self.drop_worker(id, "dropped by operator", &mut out);
        }
        out
    }

    /// Drop every worker.
    pub fn drop_all(&mut self) -> Vec<Effect> {
        let mut out = Vec::new();
        for id in self.workers.keys().cloned().collect::<Vec<_>>() {
            self.drop_worker(id, "controller shutting down", &mut out);
        }
        out
    }

    /// Ask one worker to restart; it closes the connection itself.
    pub fn restart_worker(&mut self, id: &WorkerId) -> Vec<Effect> {
        let mut out = Vec::new();
        self.push_restart(id, &mut out);
        out
    }

    /// Ask every worker on a host to restart.
    pub fn restart_host(&mut self, host: &HostName) -> Vec<Effect> {
        let mut out = Vec::new();
        for id in self.worker_ids_on(host) {
            self.push_restart(&id, &mut out);
        }
        out
    }

    /// Ask every worker to restart.
    pub fn restart_all(&mut self) -> Vec<Effect> {
        let mut out = Vec::new();
        for id in self.workers.keys().cloned().collect::<Vec<_>>() {
            self.push_restart(&id, &mut out);
        }
        out
    }

    fn push_restart(&mut self, id: &WorkerId, out: &mut Vec<Effect>) {
        if let Some(worker) = self.workers.get_mut(id) {
            worker.state = WorkerState::Restarting;
            out.push(Effect::Send {
                to: id.clone(),
                message: Message::Restart,
            });
        }
    }

    fn worker_ids_on(&self, host: &HostName) -> Vec<WorkerId> {
        self.workers
            .values()
            .filter(|w| &w.host == host)
            .map(|w| w.id.clone())
            .collect()
    }

    /// Remove a worker and return its in-flight ranges to their frames.
    fn remove_and_requeue(&mut self, id: &WorkerId) -> bool {
        let Some(mut worker) = self.workers.shift_remove(id) else {
            return false;
        };
        for (frame_number, mut queue) in worker.surrender() {
            match self.frames.iter_mut().find(|f| f.number == frame_number) {
                Some(frame) => {
                    for range in queue.drain() {
                        frame.todo.push_front(range);
                    }
                }
                None => {
                    debug!(frame = frame_number, "in-flight work for a gone frame discarded");
                }
            }
        }
        true
    }

    pub(crate) fn drop_worker(&mut self, id: WorkerId, reason: &str, out: &mut Vec<Effect>) {
        let host = self.workers.get(&id).map(|w| w.host.clone());
        if !self.remove_and_requeue(&id) {
            return;
        }
        warn!(
            worker = id.short(),
            host = %host.map(|h| h.to_string()).unwrap_or_default(),
            reason,
            "dropping worker"
        );
        out.push(Effect::Disconnect {
            id,
            reason: reason.to_string(),
        });
    }

    // --- scheduling ---

    /// One dispatch pass.
    pub fn schedule(&mut self, now: Instant) -> Vec<Effect> {
        let mut out = Vec::new();
        if self.scheduling {
            return out;
        }
        self.scheduling = true;
        self.schedule_inner(now, &mut out);
        self.scheduling = false;
        out
    }

    fn schedule_inner(&mut self, now: Instant, out: &mut Vec<Effect>) {
        if self.model.is_none() {
            return;
        }

        // Push the model to freshly version-checked workers.
        let waiting: Vec<WorkerId> = self
            .workers
            .values()
            .filter(|w| w.state == WorkerState::VersionOk)
            .map(|w| w.id.clone())
            .collect();
        for id in waiting {
            self.send_model_to(&id, out);
        }

        // Retire frames whose last in-flight range has come home.
        self.retire_complete_frames(now);

        if !self.running {
            return;
        }

        if self.frames.is_empty() {
            if !self.workers.values().any(Worker::has_work) {
                info!("all frames complete");
                self.running = false;
                if self.detached {
                    out.push(Effect::Shutdown);
                }
            }
            return;
        }

        // Hand out work: oldest frame first, workers in registration order,
        // one offer per worker per pass, repeating passes until nobody both
        // wanted and received work.
        let mut frame_idx = 0;
        'frames: while frame_idx < self.frames.len() {
            if self.frames[frame_idx].todo.is_empty() {
                frame_idx += 1;
                continue;
            }
            loop {
                let mut assigned_any = false;
                for id in self.workers.keys().cloned().collect::<Vec<_>>() {
                    match self.task_server(frame_idx, &id, now, out) {
                        TaskOutcome::Assigned { .. } => assigned_any = true,
                        TaskOutcome::NotHungry => {}
                        TaskOutcome::FrameDrained => {
                            frame_idx += 1;
                            continue 'frames;
                        }
                        TaskOutcome::FrameInvalid => {
                            frame_idx = 0;
                            continue 'frames;
                        }
                    }
                }
                if !assigned_any {
                    break;
                }
            }
            frame_idx += 1;
        }
    }

    /// Offer one worker one lump from one frame.
    pub(crate) fn task_server(
        &mut self,
        frame_idx: usize,
        worker_id: &WorkerId,
        now: Instant,
        out: &mut Vec<Effect>,
    ) -> TaskOutcome {
        let tardy = {
            let Some(worker) = self.workers.get(worker_id) else {
                return TaskOutcome::NotHungry;
            };
            if worker.state != WorkerState::Ready {
                return TaskOutcome::NotHungry;
            }
            worker.has_work()
                && worker
                    .last_send
                    .is_some_and(|sent| now.duration_since(sent) > self.config.tardy_after)
        };
        if tardy {
            self.drop_worker(worker_id.clone(), "no response to assignment", out);
            return TaskOutcome::NotHungry;
        }

        {
            let Some(worker) = self.workers.get(worker_id) else {
                return TaskOutcome::NotHungry;
            };
            if worker.in_flight_count() >= self.config.pipeline_depth {
                return TaskOutcome::NotHungry;
            }
        }

        if self.frames[frame_idx].filename.is_none() {
            warn!(
                frame = self.frames[frame_idx].number,
                "frame has no output file; abandoning it"
            );
            self.frames.remove(frame_idx);
            return TaskOutcome::FrameInvalid;
        }
        if self.frames[frame_idx].todo.is_empty() {
            return TaskOutcome::FrameDrained;
        }

        let frame = &mut self.frames[frame_idx];
        let Some(worker) = self.workers.get_mut(worker_id) else {
            return TaskOutcome::NotHungry;
        };

        if frame.needs_view(worker_id) {
            out.push(Effect::Send {
                to: worker_id.clone(),
                message: Message::Matrix {
                    script: frame.render_command.clone(),
                },
            });
            frame.mark_view_sent(worker_id.clone());
        }
        if frame.started_at.is_none() {
            frame.started_at = Some(now);
            frame.state = FrameState::InProgress;
        }

        let lump = self.config.lump_for_rate(worker.stats.weighted_rate);
        let Some(range) = frame.todo.take_front(lump) else {
            return TaskOutcome::FrameDrained;
        };
        worker.assign(frame.number, range, now);
        out.push(Effect::Send {
            to: worker_id.clone(),
            message: Message::Lines {
                start: range.start,
                stop: range.stop,
                frame: frame.number,
            },
        });
        debug!(
            worker = worker_id.short(),
            frame = frame.number,
            range = %range,
            "assigned"
        );

        let hungry = worker.in_flight_count() < self.config.pipeline_depth;
        TaskOutcome::Assigned { hungry }
    }

    /// Send the log level and model-start sequence to a version-checked
    /// worker.
    fn send_model_to(&mut self, id: &WorkerId, out: &mut Vec<Effect>) {
        let Some(model) = self.model.clone() else {
            return;
        };
        let provisioning = {
            let Some(worker) = self.workers.get(id) else {
                return;
            };
            self.hosts
                .get(&worker.host)
                .map(|h| (h.provisioning, h.remote_dir.clone()))
        };
        out.push(Effect::Send {
            to: id.clone(),
            message: Message::LogLevel {
                verbose: self.worker_logging,
            },
        });
        if let Some((Provisioning::CdOnly, dir)) = provisioning {
            out.push(Effect::Send {
                to: id.clone(),
                message: Message::ChDir {
                    dir: dir.display().to_string(),
                },
            });
        }
        out.push(Effect::Send {
            to: id.clone(),
            message: Message::Start {
                db: model.db_path.display().to_string(),
                objects: model.objects,
            },
        });
        if let Some(worker) = self.workers.get_mut(id) {
            worker.state = WorkerState::Loading;
        }
        debug!(worker = id.short(), "model push sent");
    }

    /// Evict any worker that has sat on an assignment past the tardy
    /// threshold, whatever state it is in.
    pub fn evict_tardy(&mut self, now: Instant) -> Vec<Effect> {
        let mut out = Vec::new();
        let tardy: Vec<WorkerId> = self
            .workers
            .values()
            .filter(|w| {
                w.has_work()
                    && w.last_send
                        .is_some_and(|sent| now.duration_since(sent) > self.config.tardy_after)
            })
            .map(|w| w.id.clone())
            .collect();
        for id in tardy {
            self.drop_worker(id, "no response to assignment", &mut out);
        }
        out
    }

    /// Finalize and unlink every frame with no outstanding work anywhere.
    fn retire_complete_frames(&mut self, now: Instant) {
        let mut idx = 0;
        while idx < self.frames.len() {
            let number = self.frames[idx].number;
            let complete = self.frames[idx].todo.is_empty()
                && self.frames[idx].state == FrameState::InProgress
                && !self.workers.values().any(|w| w.has_work_for(number));
            if complete {
                self.finalize_frame(idx, now);
            } else {
                idx += 1;
            }
        }
    }

    fn finalize_frame(&mut self, idx: usize, now: Instant) {
        let mut frame = self.frames.remove(idx);
        frame.state = FrameState::Done;
        frame.finished_at = Some(now);
        let elapsed = frame
            .started_at
            .map(|t| now.duration_since(t))
            .unwrap_or_default();
        info!(
            frame = frame.number,
            elapsed = %format_elapsed(elapsed),
            rays = frame.rays_fired,
            cpu_seconds = frame.cpu_seconds,
            "frame complete"
        );
        if let Some(path) = &frame.filename {
            if let Err(e) = output::protect(path) {
                warn!(frame = frame.number, error = %e, "could not write-protect output");
            }
        }
    }
}

/// Pull `-w`/`-n` overrides out of a render script; both `-w512` and
/// `-w 512` forms are accepted.
fn frame_size_from_script(script: &str, defaults: (u32, u32)) -> (u32, u32) {
    let (mut width, mut height) = defaults;
    let tokens: Vec<&str> = script
        .split(|c: char| c.is_whitespace() || c == ';')
        .filter(|t| !t.is_empty())
        .collect();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];
        let (flag, target): (&str, &mut u32) = if token.starts_with("-w") {
            ("-w", &mut width)
        } else if token.starts_with("-n") {
            ("-n", &mut height)
        } else {
            i += 1;
            continue;
        };
        let rest = &token[flag.len()..];
        let text = if rest.is_empty() {
            i += 1;
            tokens.get(i).copied().unwrap_or("")
        } else {
            rest
        };
        if let Ok(value) = text.parse::<u32>() {
            if value > 0 {
                *target = value;
            }
        }
        i += 1;
    }
    (width, height)
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
