// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{add_frame_in, disconnects, dispatcher, lines_sent, ready_worker};
use rfarm_core::HostName;
use rfarm_proto::PixelHeader;
use std::time::Instant;

fn new_worker(d: &mut Dispatcher, name: &str) -> WorkerId {
    let id = WorkerId::new(name);
    d.worker_connected(id.clone(), HostName::new(format!("host-{name}")));
    id
}

fn pixels(frame: u32, start: u32, stop: u32, fill: u8) -> Envelope {
    let count = (stop - start + 1) as usize;
    Envelope::Pixels(PixelResult {
        header: PixelHeader {
            frame,
            start,
            stop,
            rays: 100,
            cpu_seconds: 0.5,
            cpu_percent: 80.0,
        },
        rgb: vec![fill; 3 * count],
    })
}

#[test]
fn matching_version_advances_the_handshake() {
    let mut d = dispatcher(64, 1);
    let a = new_worker(&mut d, "a");
    let effects = d.handle_envelope(
        &a,
        Message::Version {
            tag: PROTOCOL_VERSION.to_string(),
        }
        .into(),
        Instant::now(),
    );
    assert!(effects.is_empty());
    assert_eq!(d.worker(&a).unwrap().state, WorkerState::VersionOk);
}

#[test]
fn version_mismatch_never_reaches_ready() {
    let dir = tempfile::tempdir().unwrap();
    let mut d = dispatcher(64, 1);
    let a = new_worker(&mut d, "a");
    add_frame_in(&mut d, dir.path(), 0);
    d.go();

    let effects = d.handle_envelope(
        &a,
        Message::Version {
            tag: "rfarm 0.0.0-stale".to_string(),
        }
        .into(),
        Instant::now(),
    );
    assert_eq!(disconnects(&effects), vec![a.clone()]);
    assert!(d.worker(&a).is_none());

    // No view or pixel traffic ever goes to the rejected worker.
    let effects = d.schedule(Instant::now());
    assert!(lines_sent(&effects, &a).is_empty());
}

#[test]
fn model_push_follows_version_ok_and_start_ack_makes_ready() {
    let mut d = dispatcher(64, 1);
    let a = new_worker(&mut d, "a");
    d.handle_envelope(
        &a,
        Message::Version {
            tag: PROTOCOL_VERSION.to_string(),
        }
        .into(),
        Instant::now(),
    );

    let effects = d.schedule(Instant::now());
    let names: Vec<&str> = effects
        .iter()
        .filter_map(|e| match e {
            Effect::Send { to, message } if to == &a => Some(message.name()),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["loglvl", "start"]);
    assert_eq!(d.worker(&a).unwrap().state, WorkerState::Loading);

    d.handle_envelope(&a, Message::StartAck.into(), Instant::now());
    assert_eq!(d.worker(&a).unwrap().state, WorkerState::Ready);
}

#[test]
fn cd_provisioned_hosts_get_a_directory_change_before_start() {
    let mut d = dispatcher(64, 1);
    d.hosts_mut().set(rfarm_core::Host {
        name: HostName::new("host-a"),
        policy: rfarm_core::ActivationPolicy::Always,
        provisioning: rfarm_core::Provisioning::CdOnly,
        remote_dir: "/scratch/render".into(),
    });
    let a = WorkerId::new("a");
    d.worker_connected(a.clone(), HostName::new("host-a"));
    d.handle_envelope(
        &a,
        Message::Version {
            tag: PROTOCOL_VERSION.to_string(),
        }
        .into(),
        Instant::now(),
    );

    let effects = d.schedule(Instant::now());
    let names: Vec<&str> = effects
        .iter()
        .filter_map(|e| match e {
            Effect::Send { to, message } if to == &a => Some(message.name()),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["loglvl", "cd", "start"]);
}

#[test]
fn pixel_results_land_in_the_file_and_the_books() {
    let dir = tempfile::tempdir().unwrap();
    let mut d = dispatcher(100, 1);
    let a = ready_worker(&mut d, "a");
    add_frame_in(&mut d, dir.path(), 0);
    let path = d.frames()[0].filename.clone().unwrap();
    d.go();

    let t0 = Instant::now();
    let effects = d.schedule(t0);
    let first = lines_sent(&effects, &a)[0];
    assert_eq!(first, (0, 31, 0));

    let effects = d.handle_envelope(&a, pixels(0, 0, 31, 7), t0 + std::time::Duration::from_secs(1));
    assert!(disconnects(&effects).is_empty());

    let data = std::fs::read(&path).unwrap();
    assert_eq!(&data[0..96], vec![7u8; 96].as_slice());

    let worker = d.worker(&a).unwrap();
    assert_eq!(worker.stats.samples, 1);
    assert!(worker.stats.weighted_rate > 0.0);
    assert_eq!(worker.in_flight_count(), 2);
    assert_eq!(d.frames()[0].rays_fired, 100);
}

#[test]
fn unowned_pixel_results_drop_the_connection() {
    let dir = tempfile::tempdir().unwrap();
    let mut d = dispatcher(100, 1);
    let a = ready_worker(&mut d, "a");
    add_frame_in(&mut d, dir.path(), 0);
    d.go();
    d.schedule(Instant::now());

    // Claims a span nobody assigned.
    let effects = d.handle_envelope(&a, pixels(0, 97, 99, 1), Instant::now());
    assert_eq!(disconnects(&effects), vec![a.clone()]);
    assert!(d.worker(&a).is_none());
    assert_eq!(d.frames()[0].todo.pixels(), 100, "in-flight work requeued");
}

#[test]
fn results_for_a_wrong_frame_are_a_violation() {
    let dir = tempfile::tempdir().unwrap();
    let mut d = dispatcher(100, 1);
    let a = ready_worker(&mut d, "a");
    add_frame_in(&mut d, dir.path(), 0);
    d.go();
    d.schedule(Instant::now());

    let effects = d.handle_envelope(&a, pixels(5, 0, 31, 1), Instant::now());
    assert_eq!(disconnects(&effects), vec![a]);
}

#[test]
fn stale_results_after_reset_are_discarded_quietly() {
    let dir = tempfile::tempdir().unwrap();
    let mut d = dispatcher(100, 1);
    let a = ready_worker(&mut d, "a");
    add_frame_in(&mut d, dir.path(), 0);
    d.go();
    d.schedule(Instant::now());
    assert!(d.worker(&a).unwrap().has_work());

    d.reset();
    assert!(d.frames().is_empty());

    // The worker still answers its old assignment; the record is consumed
    // and the pixels dropped, but the connection survives.
    let effects = d.handle_envelope(&a, pixels(0, 0, 31, 1), Instant::now());
    assert!(disconnects(&effects).is_empty());
    assert!(d.worker(&a).is_some());
    assert_eq!(d.worker(&a).unwrap().in_flight_count(), 2);
}

#[test]
fn completed_frame_is_mirrored_when_attached() {
    let dir = tempfile::tempdir().unwrap();
    let mut d = dispatcher(32, 1);
    let a = ready_worker(&mut d, "a");
    add_frame_in(&mut d, dir.path(), 0);
    d.set_fb_attached(true);
    d.go();
    d.schedule(Instant::now());

    let effects = d.handle_envelope(&a, pixels(0, 0, 31, 3), Instant::now());
    assert!(effects
        .iter()
        .any(|e| matches!(e, Effect::MirrorSpan { offset: 0, rgb } if rgb.len() == 96)));
}

#[test]
fn unsolicited_commands_are_handed_to_the_interpreter() {
    let mut d = dispatcher(64, 1);
    let a = new_worker(&mut d, "a");
    let effects = d.handle_envelope(
        &a,
        Message::Command {
            line: "stat".to_string(),
        }
        .into(),
        Instant::now(),
    );
    assert!(matches!(
        effects.as_slice(),
        [Effect::RunCommand { from, line }] if from == &a && line == "stat"
    ));
}

#[test]
fn controller_bound_messages_from_a_worker_are_fatal() {
    let mut d = dispatcher(64, 1);
    let a = new_worker(&mut d, "a");
    let effects = d.handle_envelope(&a, Message::Restart.into(), Instant::now());
    assert_eq!(disconnects(&effects), vec![a]);
}
