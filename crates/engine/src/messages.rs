// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-message protocol handlers.
//!
//! Every handler either completes its local effect or converts the failure
//! into a connection drop; nothing propagates back into the event loop.

use crate::dispatch::Dispatcher;
use crate::effect::Effect;
use crate::output;
use rfarm_core::{WorkerId, WorkerState};
use rfarm_proto::{Envelope, Message, PixelResult, PROTOCOL_VERSION};
use std::time::Instant;
use tracing::{debug, info, warn};

impl Dispatcher {
    /// Dispatch one decoded envelope from a worker.
    pub fn handle_envelope(
        &mut self,
        id: &WorkerId,
        envelope: Envelope,
        now: Instant,
    ) -> Vec<Effect> {
        let mut out = Vec::new();
        match envelope {
            Envelope::Control(message) => self.handle_control(id, message, &mut out),
            Envelope::Pixels(result) => self.handle_pixels(id, result, now, &mut out),
        }
        out
    }

    fn handle_control(&mut self, id: &WorkerId, message: Message, out: &mut Vec<Effect>) {
        match message {
            Message::Version { tag } => self.on_version(id, &tag, out),
            Message::StartAck => self.on_start_ack(id),
            Message::Print { text } => self.on_print(id, &text),
            Message::Command { line } => out.push(Effect::RunCommand {
                from: id.clone(),
                line,
            }),
            other => {
                let reason = format!("unexpected {} message from worker", other.name());
                self.drop_worker(id.clone(), &reason, out);
            }
        }
    }

    fn on_version(&mut self, id: &WorkerId, tag: &str, out: &mut Vec<Effect>) {
        match self.worker(id).map(|w| w.state) {
            Some(WorkerState::New) => {}
            Some(_) => {
                self.drop_worker(id.clone(), "version message after handshake", out);
                return;
            }
            None => return,
        }
        if tag != PROTOCOL_VERSION {
            warn!(
                worker = id.short(),
                got = tag,
                want = PROTOCOL_VERSION,
                "protocol version mismatch"
            );
            self.drop_worker(id.clone(), "protocol version mismatch", out);
            return;
        }
        if let Some(worker) = self.workers.get_mut(id) {
            worker.state = WorkerState::VersionOk;
            debug!(worker = id.short(), "version check passed");
        }
    }

    fn on_start_ack(&mut self, id: &WorkerId) {
        if let Some(worker) = self.workers.get_mut(id) {
            if worker.state == WorkerState::Loading {
                worker.state = WorkerState::Ready;
                info!(worker = id.short(), host = %worker.host, "worker ready");
            } else {
                debug!(worker = id.short(), state = %worker.state, "ignoring start ack");
            }
        }
    }

    fn on_print(&self, id: &WorkerId, text: &str) {
        if self.worker_logging {
            let host = self
                .worker(id)
                .map(|w| w.host.to_string())
                .unwrap_or_default();
            info!(worker = id.short(), host = %host, "{}", text.trim_end());
        }
    }

    fn handle_pixels(
        &mut self,
        id: &WorkerId,
        result: PixelResult,
        now: Instant,
        out: &mut Vec<Effect>,
    ) {
        let header = result.header;
        let span_pixels = header.stop - header.start + 1;
        let blend = self.config.rate_blend;

        // Route by in-flight ownership: the declared frame and span must
        // match a record this worker actually holds.
        let owned = {
            let Some(worker) = self.workers.get_mut(id) else {
                return;
            };
            let owned = worker.complete(header.frame, header.start, header.stop);
            if owned {
                let elapsed = worker
                    .last_send
                    .map(|sent| now.duration_since(sent).as_secs_f64())
                    .unwrap_or(0.0);
                worker.stats.record(
                    span_pixels,
                    elapsed,
                    header.cpu_seconds,
                    header.cpu_percent,
                    blend,
                );
            }
            owned
        };
        if !owned {
            warn!(
                worker = id.short(),
                frame = header.frame,
                start = header.start,
                stop = header.stop,
                "pixel result for work this worker does not hold"
            );
            self.drop_worker(id.clone(), "pixel result for unassigned work", out);
            return;
        }

        let Some(frame) = self.frames.iter_mut().find(|f| f.number == header.frame) else {
            // The frame was discarded after assignment; the in-flight
            // record was consumed above, the pixels just get dropped.
            debug!(worker = id.short(), frame = header.frame, "result for a discarded frame");
            return;
        };

        frame.note_result(header.rays, header.cpu_seconds);
        if let Some(path) = frame.filename.clone() {
            if let Err(e) = output::write_span(&path, header.start, &result.rgb) {
                warn!(frame = frame.number, error = %e, "span write failed; pixels lost");
            }
        }
        debug!(
            worker = id.short(),
            frame = header.frame,
            start = header.start,
            stop = header.stop,
            "span complete"
        );
        if self.fb_attached {
            out.push(Effect::MirrorSpan {
                offset: header.start,
                rgb: result.rgb,
            });
        }
    }
}

#[cfg(test)]
#[path = "messages_tests.rs"]
mod tests;
