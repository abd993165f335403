// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Length-prefixed framing and async encode/decode.
//!
//! Wire format: 4-byte big-endian length, then a 1-byte frame kind, then the
//! payload. Control frames carry a JSON-encoded [`Message`]; pixel frames
//! carry a fixed binary header followed by raw RGB bytes.

use crate::message::{Envelope, Message, PixelHeader, PixelResult};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Hard cap on a single frame. A full 8192-pixel result is under 25 KiB, so
/// anything near this is a corrupt or hostile peer.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

const KIND_CONTROL: u8 = 0;
const KIND_PIXELS: u8 = 1;

/// Protocol errors
#[derive(Debug, Error)]
pub enum WireError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("connection closed")]
    ConnectionClosed,

    #[error("empty frame")]
    EmptyFrame,

    #[error("unknown frame kind {0:#x}")]
    UnknownKind(u8),

    #[error("truncated pixel frame: {len} bytes")]
    TruncatedPixels { len: usize },

    #[error("pixel header inconsistent: span [{start}, {stop}] with {actual} payload bytes")]
    PixelPayloadMismatch { start: u32, stop: u32, actual: usize },
}

/// Read one framed envelope from an async reader.
pub async fn read_envelope<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<Envelope, WireError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(WireError::ConnectionClosed);
        }
        Err(e) => return Err(WireError::Io(e)),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(WireError::FrameTooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }
    if len == 0 {
        return Err(WireError::EmptyFrame);
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    let payload = &buf[1..];
    match buf[0] {
        KIND_CONTROL => Ok(Envelope::Control(serde_json::from_slice(payload)?)),
        KIND_PIXELS => decode_pixels(payload).map(Envelope::Pixels),
        other => Err(WireError::UnknownKind(other)),
    }
}

fn decode_pixels(payload: &[u8]) -> Result<PixelResult, WireError> {
    if payload.len() < PixelHeader::WIRE_LEN {
        return Err(WireError::TruncatedPixels { len: payload.len() });
    }
    let (head, rgb) = payload.split_at(PixelHeader::WIRE_LEN);
    let mut fixed = [0u8; PixelHeader::WIRE_LEN];
    fixed.copy_from_slice(head);
    let header = PixelHeader::decode(&fixed);
    if header.stop < header.start || rgb.len() != 3 * (header.stop - header.start + 1) as usize {
        return Err(WireError::PixelPayloadMismatch {
            start: header.start,
            stop: header.stop,
            actual: rgb.len(),
        });
    }
    Ok(PixelResult {
        header,
        rgb: rgb.to_vec(),
    })
}

/// Write one framed envelope to an async writer.
pub async fn write_envelope<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    envelope: &Envelope,
) -> Result<(), WireError> {
    let mut frame = Vec::new();
    match envelope {
        Envelope::Control(message) => {
            frame.push(KIND_CONTROL);
            serde_json::to_writer(&mut frame, message)?;
        }
        Envelope::Pixels(result) => {
            frame.push(KIND_PIXELS);
            frame.extend_from_slice(&result.header.encode());
            frame.extend_from_slice(&result.rgb);
        }
    }
    if frame.len() > MAX_FRAME_SIZE {
        return Err(WireError::FrameTooLarge {
            size: frame.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    writer.write_all(&(frame.len() as u32).to_be_bytes()).await?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Convenience for sending a single control message.
pub async fn write_message<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    message: &Message,
) -> Result<(), WireError> {
    write_envelope(writer, &Envelope::Control(message.clone())).await
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
