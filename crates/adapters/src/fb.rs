// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Framebuffer sink: optional live mirror of completed scanlines.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from a framebuffer sink.
#[derive(Debug, Error)]
pub enum FbError {
    #[error("framebuffer write failed: {0}")]
    Write(String),
}

/// Destination for completed pixel spans, mirroring the output file.
///
/// The real device lives outside this repository; the controller only needs
/// "write this span at this pixel offset" and "clear".
#[async_trait]
pub trait FramebufferSink: Send + Sync {
    async fn write_span(&self, offset: u32, rgb: &[u8]) -> Result<(), FbError>;
    async fn clear(&self) -> Result<(), FbError>;
}

/// Sink that discards everything; used when no framebuffer is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFramebuffer;

#[async_trait]
impl FramebufferSink for NoopFramebuffer {
    async fn write_span(&self, _offset: u32, _rgb: &[u8]) -> Result<(), FbError> {
        Ok(())
    }

    async fn clear(&self) -> Result<(), FbError> {
        Ok(())
    }
}

/// Recorded span write.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone)]
pub struct SpanCall {
    pub offset: u32,
    pub rgb: Vec<u8>,
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
struct FakeFbState {
    spans: Vec<SpanCall>,
    clears: usize,
}

/// Fake sink recording calls for tests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone, Default)]
pub struct FakeFramebuffer {
    inner: std::sync::Arc<parking_lot::Mutex<FakeFbState>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeFramebuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded span writes.
    pub fn spans(&self) -> Vec<SpanCall> {
        self.inner.lock().spans.clone()
    }

    /// Number of clear calls.
    pub fn clears(&self) -> usize {
        self.inner.lock().clears
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl FramebufferSink for FakeFramebuffer {
    async fn write_span(&self, offset: u32, rgb: &[u8]) -> Result<(), FbError> {
        self.inner.lock().spans.push(SpanCall {
            offset,
            rgb: rgb.to_vec(),
        });
        Ok(())
    }

    async fn clear(&self) -> Result<(), FbError> {
        self.inner.lock().clears += 1;
        Ok(())
    }
}

#[cfg(test)]
#[path = "fb_tests.rs"]
mod tests;
