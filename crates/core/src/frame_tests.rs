// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_frame_covers_its_full_extent() {
    let frame = Frame::new(3, 100, 2, "viewsize 1;".to_string());
    assert_eq!(frame.pixels(), 200);
    assert_eq!(frame.todo.pixels(), 200);
    assert_eq!(frame.state, FrameState::Queued);
    assert!(frame.started_at.is_none());
}

#[test]
fn view_script_is_owed_once_per_worker() {
    let mut frame = Frame::new(0, 10, 10, String::new());
    let a = WorkerId::new("a");
    let b = WorkerId::new("b");
    assert!(frame.needs_view(&a));
    frame.mark_view_sent(a.clone());
    assert!(!frame.needs_view(&a));
    assert!(frame.needs_view(&b));
}

#[test]
fn result_accounting_accumulates() {
    let mut frame = Frame::new(0, 10, 10, String::new());
    frame.note_result(1000, 1.5);
    frame.note_result(500, 0.5);
    assert_eq!(frame.rays_fired, 1500);
    assert!((frame.cpu_seconds - 2.0).abs() < 1e-9);
}
