// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::message::PROTOCOL_VERSION;

#[tokio::test]
async fn control_messages_survive_the_wire() {
    let (mut a, mut b) = tokio::io::duplex(4096);
    let sent = Message::Version {
        tag: PROTOCOL_VERSION.to_string(),
    };
    write_message(&mut a, &sent).await.unwrap();
    write_message(&mut a, &Message::Lines { start: 0, stop: 31, frame: 7 })
        .await
        .unwrap();

    assert_eq!(read_envelope(&mut b).await.unwrap(), Envelope::Control(sent));
    match read_envelope(&mut b).await.unwrap() {
        Envelope::Control(Message::Lines { start, stop, frame }) => {
            assert_eq!((start, stop, frame), (0, 31, 7));
        }
        other => panic!("unexpected envelope: {other:?}"),
    }
}

#[tokio::test]
async fn pixel_results_survive_the_wire() {
    let (mut a, mut b) = tokio::io::duplex(4096);
    let result = PixelResult {
        header: PixelHeader {
            frame: 2,
            start: 10,
            stop: 13,
            rays: 4242,
            cpu_seconds: 1.25,
            cpu_percent: 87.5,
        },
        rgb: vec![9u8; 12],
    };
    write_envelope(&mut a, &Envelope::Pixels(result.clone()))
        .await
        .unwrap();
    assert_eq!(read_envelope(&mut b).await.unwrap(), Envelope::Pixels(result));
}

#[tokio::test]
async fn pixel_payload_length_must_match_the_header() {
    let (mut a, mut b) = tokio::io::duplex(4096);
    let bogus = PixelResult {
        header: PixelHeader {
            frame: 0,
            start: 0,
            stop: 9, // promises 30 bytes
            rays: 0,
            cpu_seconds: 0.0,
            cpu_percent: 0.0,
        },
        rgb: vec![0u8; 6],
    };
    write_envelope(&mut a, &Envelope::Pixels(bogus)).await.unwrap();
    match read_envelope(&mut b).await {
        Err(WireError::PixelPayloadMismatch { start: 0, stop: 9, actual: 6 }) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn peer_hangup_maps_to_connection_closed() {
    let (a, mut b) = tokio::io::duplex(4096);
    drop(a);
    match read_envelope(&mut b).await {
        Err(WireError::ConnectionClosed) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn oversized_length_prefix_is_rejected() {
    use tokio::io::AsyncWriteExt;
    let (mut a, mut b) = tokio::io::duplex(4096);
    a.write_all(&(MAX_FRAME_SIZE as u32 + 1).to_be_bytes())
        .await
        .unwrap();
    match read_envelope(&mut b).await {
        Err(WireError::FrameTooLarge { .. }) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn header_round_trip_preserves_floats() {
    let header = PixelHeader {
        frame: u32::MAX,
        start: 1,
        stop: 2,
        rays: u64::MAX,
        cpu_seconds: 123.456,
        cpu_percent: 0.001,
    };
    assert_eq!(PixelHeader::decode(&header.encode()), header);
}
