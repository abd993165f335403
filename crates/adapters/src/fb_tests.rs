// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn fake_records_spans_and_clears() {
    let fb = FakeFramebuffer::new();
    fb.write_span(42, &[1, 2, 3]).await.unwrap();
    fb.clear().await.unwrap();
    let spans = fb.spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].offset, 42);
    assert_eq!(spans[0].rgb, vec![1, 2, 3]);
    assert_eq!(fb.clears(), 1);
}

#[tokio::test]
async fn noop_accepts_everything() {
    let fb = NoopFramebuffer;
    fb.write_span(0, &[0; 30]).await.unwrap();
    fb.clear().await.unwrap();
}
