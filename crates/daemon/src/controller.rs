// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The controller loop state: owns the dispatcher and executes its effects.

use crate::commands;
use crate::event::Event;
use crate::listener::Connections;
use rfarm_adapters::{FramebufferSink, HostLauncher};
use rfarm_core::{Clock, DispatchConfig, WorkerId};
use rfarm_engine::{Dispatcher, Effect};
use rfarm_proto::Envelope;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Controller state threaded through the daemon loop.
pub struct Controller<C: Clock> {
    pub dispatcher: Dispatcher,
    pub connections: Connections,
    pub launcher: Box<dyn HostLauncher>,
    pub fb: Box<dyn FramebufferSink>,
    clock: C,
    /// Address launched workers are told to dial back to.
    pub controller_addr: String,
    pub port: u16,
    /// `wait` is in effect: operator lines are deferred until the run
    /// drains.
    waiting: bool,
    deferred: VecDeque<String>,
    /// Operator input is gone or ignored from here on.
    detached: bool,
    shutdown: bool,
}

impl<C: Clock> Controller<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: DispatchConfig,
        connections: Connections,
        launcher: Box<dyn HostLauncher>,
        fb: Box<dyn FramebufferSink>,
        clock: C,
        controller_addr: String,
        port: u16,
    ) -> Self {
        Self {
            dispatcher: Dispatcher::new(config),
            connections,
            launcher,
            fb,
            clock,
            controller_addr,
            port,
            waiting: false,
            deferred: VecDeque::new(),
            detached: false,
            shutdown: false,
        }
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown
    }

    /// Defer operator input until the queued work drains.
    pub fn begin_wait(&mut self) {
        self.waiting = true;
    }

    /// Stop consuming operator input and exit once the work drains.
    pub fn detach(&mut self) {
        info!("detaching from operator input");
        self.detached = true;
        self.dispatcher.set_detached();
    }

    /// Process one event, then run a dispatch pass.
    pub async fn handle_event(&mut self, event: Event) {
        match event {
            Event::Connected { id, host } => {
                self.dispatcher.worker_connected(id, host);
            }
            Event::Message { id, envelope } => {
                let now = self.clock.now();
                let effects = self.dispatcher.handle_envelope(&id, envelope, now);
                self.apply(effects).await;
            }
            Event::Closed { id, reason } => {
                debug!(worker = id.short(), reason = %reason, "worker connection ended");
                self.connections.lock().remove(&id);
                self.dispatcher.worker_closed(&id);
            }
            Event::Operator { line } => {
                if self.detached {
                    debug!(line = %line, "operator line ignored after detach");
                } else if self.waiting {
                    self.deferred.push_back(line);
                } else {
                    self.run_command(&line).await;
                }
            }
            Event::OperatorEof => self.operator_eof().await,
        }
        self.schedule_pass().await;
    }

    /// Dispatch pass plus effect execution; also ends a `wait` once the
    /// work drains.
    pub async fn schedule_pass(&mut self) {
        let now = self.clock.now();
        let effects = self.dispatcher.schedule(now);
        self.apply(effects).await;
        self.check_wait_over().await;
    }

    /// Periodic liveness pass: reap tardy workers, then reschedule.
    pub async fn tick(&mut self) {
        let now = self.clock.now();
        let effects = self.dispatcher.evict_tardy(now);
        self.apply(effects).await;
        self.schedule_pass().await;
    }

    /// Host auto-start pass (10-minute cadence, and after `add`).
    pub async fn start_servers(&mut self) {
        let wall = chrono::Local::now();
        let port = self.port;
        let addr = self.controller_addr.clone();
        let effects = self.dispatcher.start_servers(&wall, &addr, port);
        self.apply(effects).await;
    }

    /// Run one operator command line; failures go to the log.
    pub async fn run_command(&mut self, line: &str) {
        if let Err(e) = commands::execute(self, line).await {
            warn!(command = line, error = %e, "command failed");
        }
    }

    async fn check_wait_over(&mut self) {
        if !self.waiting || !self.dispatcher.frames().is_empty() {
            return;
        }
        self.waiting = false;
        while let Some(line) = self.deferred.pop_front() {
            self.run_command(&line).await;
            if self.waiting {
                break;
            }
        }
    }

    /// Graceful shutdown on operator EOF or a termination signal: with no
    /// run active, drop everything and exit; with a run active, finish it
    /// batch-style and let workers restart themselves clean.
    async fn operator_eof(&mut self) {
        info!("operator input ended");
        self.detached = true;
        self.dispatcher.set_detached();
        if self.dispatcher.is_running() {
            let effects = self.dispatcher.restart_all();
            self.apply(effects).await;
        } else {
            let effects = self.dispatcher.drop_all();
            self.apply(effects).await;
            self.shutdown = true;
        }
    }

    /// Execute dispatcher effects.
    pub async fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send { to, message } => self.send(&to, Envelope::Control(message)),
                Effect::Disconnect { id, reason } => {
                    debug!(worker = id.short(), reason = %reason, "closing connection");
                    self.connections.lock().remove(&id);
                }
                Effect::Launch { request } => {
                    if let Err(e) = self.launcher.launch(request).await {
                        warn!(error = %e, "launch failed");
                    }
                }
                Effect::MirrorSpan { offset, rgb } => {
                    if let Err(e) = self.fb.write_span(offset, &rgb).await {
                        warn!(error = %e, "framebuffer write failed");
                    }
                }
                Effect::RunCommand { from, line } => {
                    info!(worker = from.short(), command = %line, "remote command");
                    Box::pin(self.run_command(&line)).await;
                    let effects = self
                        .dispatcher
                        .disconnect_worker(&from, "remote command done");
                    Box::pin(self.apply(effects)).await;
                }
                Effect::Shutdown => {
                    info!("work drained; exiting");
                    self.shutdown = true;
                }
            }
        }
    }

    fn send(&self, to: &WorkerId, envelope: Envelope) {
        let connections = self.connections.lock();
        match connections.get(to) {
            Some(handle) => {
                if !handle.send(envelope) {
                    warn!(worker = to.short(), "outbound queue full; message dropped");
                }
            }
            None => debug!(worker = to.short(), "message for a gone connection dropped"),
        }
    }
}
