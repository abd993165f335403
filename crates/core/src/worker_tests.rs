// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Instant;

fn worker() -> Worker {
    Worker::new(WorkerId::new("w-test"), HostName::from("render1"))
}

#[test]
fn assignments_are_counted_across_frames() {
    let mut w = worker();
    let now = Instant::now();
    assert!(!w.has_work());
    w.assign(0, WorkRange::new(0, 99), now);
    w.assign(0, WorkRange::new(200, 299), now);
    w.assign(1, WorkRange::new(0, 31), now);
    assert_eq!(w.in_flight_count(), 3);
    assert!(w.has_work_for(0));
    assert!(w.has_work_for(1));
    assert!(!w.has_work_for(2));
    assert_eq!(w.last_send, Some(now));
}

#[test]
fn complete_consumes_the_matching_record() {
    let mut w = worker();
    let now = Instant::now();
    w.assign(0, WorkRange::new(0, 99), now);
    assert!(w.complete(0, 0, 99));
    assert!(!w.has_work());
    // A second completion of the same span no longer matches.
    assert!(!w.complete(0, 0, 99));
}

#[test]
fn complete_rejects_spans_the_worker_does_not_hold() {
    let mut w = worker();
    w.assign(0, WorkRange::new(0, 99), Instant::now());
    assert!(!w.complete(1, 0, 99), "wrong frame");
    assert!(!w.complete(0, 50, 150), "straddles the assignment");
    assert_eq!(w.in_flight_count(), 1);
}

#[test]
fn partial_completion_splits_the_record() {
    let mut w = worker();
    w.assign(0, WorkRange::new(0, 99), Instant::now());
    assert!(w.complete(0, 40, 59));
    assert_eq!(w.in_flight_count(), 2);
    assert!(w.complete(0, 0, 39));
    assert!(w.complete(0, 60, 99));
    assert!(!w.has_work());
}

#[test]
fn surrender_returns_everything() {
    let mut w = worker();
    let now = Instant::now();
    w.assign(0, WorkRange::new(0, 99), now);
    w.assign(2, WorkRange::new(200, 299), now);
    let surrendered = w.surrender();
    assert_eq!(surrendered.len(), 2);
    assert!(!w.has_work());
}

#[test]
fn short_id_for_logs() {
    let id = WorkerId::new("0123456789abcdef");
    assert_eq!(id.short(), "01234567");
    let tiny = WorkerId::new("w1");
    assert_eq!(tiny.short(), "w1");
}
