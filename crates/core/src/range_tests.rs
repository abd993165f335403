// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use yare::parameterized;

fn queue_of(ranges: &[(u32, u32)]) -> WorkQueue {
    let mut queue = WorkQueue::new();
    for &(start, stop) in ranges {
        queue.push_back(WorkRange::new(start, stop));
    }
    queue
}

fn contents(queue: &WorkQueue) -> Vec<(u32, u32)> {
    queue.iter().map(|r| (r.start, r.stop)).collect()
}

#[parameterized(
    head = { (10, 20), vec![(21, 50)] },
    tail = { (30, 50), vec![(10, 29)] },
    interior = { (30, 40), vec![(10, 29), (41, 50)] },
    exact = { (10, 50), vec![] },
)]
fn remove_completed_cases(done: (u32, u32), expected: Vec<(u32, u32)>) {
    let mut queue = queue_of(&[(10, 50)]);
    assert!(queue.remove_completed(done.0, done.1));
    assert_eq!(contents(&queue), expected);
}

#[test]
fn remove_completed_only_touches_the_owner() {
    let mut queue = queue_of(&[(0, 9), (20, 29), (40, 49)]);
    assert!(queue.remove_completed(20, 24));
    assert_eq!(contents(&queue), vec![(0, 9), (25, 29), (40, 49)]);
}

#[test]
fn remove_completed_without_owner_is_rejected() {
    let mut queue = queue_of(&[(10, 50)]);
    // Straddles the owner's boundary
    assert!(!queue.remove_completed(5, 15));
    // Entirely outside
    assert!(!queue.remove_completed(60, 70));
    assert_eq!(contents(&queue), vec![(10, 50)]);
}

#[test]
fn take_front_splits_a_large_head() {
    let mut queue = WorkQueue::full(100);
    let taken = queue.take_front(32).unwrap();
    assert_eq!((taken.start, taken.stop), (0, 31));
    assert_eq!(contents(&queue), vec![(32, 99)]);
}

#[test]
fn take_front_consumes_a_small_head_whole() {
    let mut queue = queue_of(&[(0, 9), (50, 59)]);
    let taken = queue.take_front(32).unwrap();
    assert_eq!((taken.start, taken.stop), (0, 9));
    assert_eq!(contents(&queue), vec![(50, 59)]);
}

#[test]
fn take_front_on_empty_queue() {
    let mut queue = WorkQueue::new();
    assert!(queue.take_front(32).is_none());
}

#[test]
fn push_front_puts_requeued_work_first() {
    let mut queue = queue_of(&[(50, 99)]);
    queue.push_front(WorkRange::new(0, 9));
    assert_eq!(queue.take_front(1000).map(|r| r.start), Some(0));
}

#[test]
fn pixel_accounting() {
    let queue = queue_of(&[(0, 9), (20, 20)]);
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.pixels(), 11);
    assert_eq!(WorkQueue::full(0).pixels(), 0);
}

proptest! {
    /// Taking lumps and completing them must exactly cover the original
    /// extent: no pixel lost, no pixel duplicated.
    #[test]
    fn take_then_complete_partitions_the_extent(
        extent in 1u32..5000,
        lumps in prop::collection::vec(1u32..700, 1..40),
    ) {
        let mut todo = WorkQueue::full(extent);
        let mut in_flight = WorkQueue::new();
        for lump in lumps {
            if let Some(range) = todo.take_front(lump) {
                in_flight.push_back(range);
            }
        }
        prop_assert_eq!(todo.pixels() + in_flight.pixels(), u64::from(extent));

        // Complete every in-flight range; the union left in todo is intact.
        for range in in_flight.drain() {
            let mut scratch = WorkQueue::new();
            scratch.push_back(range);
            prop_assert!(scratch.remove_completed(range.start, range.stop));
            prop_assert!(scratch.is_empty());
        }
    }

    /// remove_completed never changes the pixel count by anything other
    /// than the completed span, and keeps ranges disjoint and ordered.
    #[test]
    fn remove_completed_is_exact(
        extent in 10u32..2000,
        a in 0u32..2000,
        len in 1u32..200,
    ) {
        let mut queue = WorkQueue::full(extent);
        let before = queue.pixels();
        let b = a.saturating_add(len - 1);
        let matched = queue.remove_completed(a, b);
        if matched {
            prop_assert_eq!(queue.pixels(), before - u64::from(b - a + 1));
        } else {
            prop_assert_eq!(queue.pixels(), before);
        }
        let ranges: Vec<_> = queue.iter().copied().collect();
        for pair in ranges.windows(2) {
            prop_assert!(pair[0].stop < pair[1].start);
        }
    }
}
