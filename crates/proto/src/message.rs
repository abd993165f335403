// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message types carried over the wire.

use serde::{Deserialize, Serialize};

/// Version tag exchanged when a connection opens; any mismatch is fatal to
/// that connection.
pub const PROTOCOL_VERSION: &str = concat!("rfarm ", env!("CARGO_PKG_VERSION"));

/// Control messages (everything except pixel results).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Version handshake, sent by both ends on connect.
    Version { tag: String },
    /// Controller → worker: load this database and these objects.
    Start { db: String, objects: Vec<String> },
    /// Worker → controller: model loaded, ready for assignments.
    StartAck,
    /// Controller → worker: change into this directory before loading.
    ChDir { dir: String },
    /// Controller → worker: the frame's accumulated view/render script.
    Matrix { script: String },
    /// Controller → worker: semicolon-separated render-option sub-commands.
    Options { opts: String },
    /// Controller → worker: render this inclusive pixel span of a frame.
    Lines { start: u32, stop: u32, frame: u32 },
    /// Controller → worker: toggle remote verbosity.
    LogLevel { verbose: bool },
    /// Controller → worker: drop everything and reconnect fresh.
    Restart,
    /// Worker → controller: free-text log line.
    Print { text: String },
    /// Worker → controller: run one operator command, then drop me.
    Command { line: String },
}

impl Message {
    /// Short name for log lines and protocol errors.
    pub fn name(&self) -> &'static str {
        match self {
            Message::Version { .. } => "version",
            Message::Start { .. } => "start",
            Message::StartAck => "start_ack",
            Message::ChDir { .. } => "cd",
            Message::Matrix { .. } => "matrix",
            Message::Options { .. } => "options",
            Message::Lines { .. } => "lines",
            Message::LogLevel { .. } => "loglvl",
            Message::Restart => "restart",
            Message::Print { .. } => "print",
            Message::Command { .. } => "cmd",
        }
    }
}

/// Fixed-layout header preceding the raw RGB bytes of a pixel result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelHeader {
    pub frame: u32,
    pub start: u32,
    pub stop: u32,
    pub rays: u64,
    pub cpu_seconds: f64,
    pub cpu_percent: f64,
}

impl PixelHeader {
    /// Encoded size: three u32s, one u64, two f64s, all big-endian.
    pub const WIRE_LEN: usize = 4 + 4 + 4 + 8 + 8 + 8;

    pub fn encode(&self) -> [u8; Self::WIRE_LEN] {
        let mut buf = [0u8; Self::WIRE_LEN];
        buf[0..4].copy_from_slice(&self.frame.to_be_bytes());
        buf[4..8].copy_from_slice(&self.start.to_be_bytes());
        buf[8..12].copy_from_slice(&self.stop.to_be_bytes());
        buf[12..20].copy_from_slice(&self.rays.to_be_bytes());
        buf[20..28].copy_from_slice(&self.cpu_seconds.to_be_bytes());
        buf[28..36].copy_from_slice(&self.cpu_percent.to_be_bytes());
        buf
    }

    pub fn decode(buf: &[u8; Self::WIRE_LEN]) -> Self {
        let u32_at = |i: usize| u32::from_be_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]);
        let u64_at = |i: usize| {
            u64::from_be_bytes([
                buf[i],
                buf[i + 1],
                buf[i + 2],
                buf[i + 3],
                buf[i + 4],
                buf[i + 5],
                buf[i + 6],
                buf[i + 7],
            ])
        };
        Self {
            frame: u32_at(0),
            start: u32_at(4),
            stop: u32_at(8),
            rays: u64_at(12),
            cpu_seconds: f64::from_bits(u64_at(20)),
            cpu_percent: f64::from_bits(u64_at(28)),
        }
    }
}

/// A completed scanline result: header plus `3 * (stop - start + 1)` raw
/// RGB bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelResult {
    pub header: PixelHeader,
    pub rgb: Vec<u8>,
}

/// Anything that can cross the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Control(Message),
    Pixels(PixelResult),
}

impl From<Message> for Envelope {
    fn from(message: Message) -> Self {
        Self::Control(message)
    }
}
