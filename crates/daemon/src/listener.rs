// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP listener and per-connection I/O tasks.
//!
//! Each accepted connection gets a reader task (decodes frames, emits
//! events) and a writer task (drains the outbound queue). The controller
//! loop never touches a socket directly.

use crate::event::Event;
use parking_lot::Mutex;
use rfarm_core::{HostName, WorkerId};
use rfarm_proto::{self as proto, Envelope, Message, WireError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Outbound queue depth per connection.
const OUTBOUND_DEPTH: usize = 64;

/// Handle to one worker connection's outbound queue.
pub struct ConnectionHandle {
    outbound: mpsc::Sender<Envelope>,
}

impl ConnectionHandle {
    /// Queue an envelope without blocking. Returns `false` when the queue
    /// is full; the frame is dropped and the tardy check reaps a peer that
    /// stays stuck.
    pub fn send(&self, envelope: Envelope) -> bool {
        self.outbound.try_send(envelope).is_ok()
    }
}

/// Registry shared between the listener task and the controller loop.
///
/// This is the only state both tasks touch; everything else is owned by
/// the controller loop.
pub type Connections = Arc<Mutex<HashMap<WorkerId, ConnectionHandle>>>;

pub fn new_connections() -> Connections {
    Arc::new(Mutex::new(HashMap::new()))
}

/// Accept-loop task: registers each connection and spawns its I/O tasks.
pub async fn run_listener(
    listener: TcpListener,
    connections: Connections,
    events: mpsc::Sender<Event>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let id = WorkerId::fresh();
                let host = HostName::new(peer.ip().to_string());
                debug!(worker = id.short(), peer = %peer, "connection accepted");
                spawn_connection(stream, id.clone(), &connections, events.clone());
                if events.send(Event::Connected { id, host }).await.is_err() {
                    return; // controller gone
                }
            }
            Err(e) => {
                error!(error = %e, "accept failed");
            }
        }
    }
}

fn spawn_connection(
    stream: TcpStream,
    id: WorkerId,
    connections: &Connections,
    events: mpsc::Sender<Event>,
) {
    let (read_half, write_half) = stream.into_split();
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_DEPTH);

    // Greet with our version so the far end can validate us too.
    let _ = outbound_tx.try_send(Envelope::Control(Message::Version {
        tag: proto::PROTOCOL_VERSION.to_string(),
    }));

    connections.lock().insert(
        id.clone(),
        ConnectionHandle {
            outbound: outbound_tx,
        },
    );

    tokio::spawn(write_loop(write_half, outbound_rx, id.clone()));
    tokio::spawn(read_loop(read_half, id, events));
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<Envelope>,
    id: WorkerId,
) {
    while let Some(envelope) = outbound.recv().await {
        if let Err(e) = proto::write_envelope(&mut writer, &envelope).await {
            debug!(worker = id.short(), error = %e, "write failed; closing writer");
            break;
        }
    }
    // Dropping the writer closes our outbound direction.
}

async fn read_loop(mut reader: OwnedReadHalf, id: WorkerId, events: mpsc::Sender<Event>) {
    loop {
        match proto::read_envelope(&mut reader).await {
            Ok(envelope) => {
                let sent = events
                    .send(Event::Message {
                        id: id.clone(),
                        envelope,
                    })
                    .await;
                if sent.is_err() {
                    return;
                }
            }
            Err(WireError::ConnectionClosed) => {
                let _ = events
                    .send(Event::Closed {
                        id,
                        reason: "connection closed".to_string(),
                    })
                    .await;
                return;
            }
            Err(e) => {
                let _ = events
                    .send(Event::Closed {
                        id,
                        reason: e.to_string(),
                    })
                    .await;
                return;
            }
        }
    }
}
