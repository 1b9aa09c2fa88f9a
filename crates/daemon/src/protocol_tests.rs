// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use super::*;

fn payload(frame: &[u8]) -> serde_json::Value {
    serde_json::from_slice(&frame[4..]).unwrap()
}

#[test]
fn frame_prefix_is_big_endian_payload_length() {
    let frame = to_frame(&Request::Ping).unwrap();
    let body = br#"{"type":"Ping"}"#;
    assert_eq!(&frame[..4], &(body.len() as u32).to_be_bytes());
    assert_eq!(&frame[4..], body);
}

#[test]
fn console_request_carries_the_raw_line() {
    let frame = to_frame(&Request::Console {
        command: "set client * trace file=W1.TRC".to_string(),
    })
    .unwrap();
    let json = payload(&frame);
    assert_eq!(json["type"], "Console");
    assert_eq!(json["command"], "set client * trace file=W1.TRC");
}

#[yare::parameterized(
    missing   = { r#"{"type":"Shutdown"}"#, StopMode::Graceful },
    graceful  = { r#"{"type":"Shutdown","mode":"graceful"}"#, StopMode::Graceful },
    immediate = { r#"{"type":"Shutdown","mode":"immediate"}"#, StopMode::Immediate },
)]
fn shutdown_mode_decodes(json: &str, expected: StopMode) {
    let request: Request = serde_json::from_str(json).unwrap();
    assert_eq!(request, Request::Shutdown { mode: expected });
}

#[test]
fn stop_mode_maps_to_worker_shutdown_state() {
    assert_eq!(ShutdownState::from(StopMode::Graceful), ShutdownState::Graceful);
    assert_eq!(ShutdownState::from(StopMode::Immediate), ShutdownState::Immediate);
    assert_eq!(StopMode::from_immediate_flag(true), StopMode::Immediate);
    assert_eq!(StopMode::from_immediate_flag(false), StopMode::Graceful);
}

#[test]
fn protocol_version_carries_package_version() {
    assert!(PROTOCOL_VERSION.starts_with(env!("CARGO_PKG_VERSION")));
    assert!(PROTOCOL_VERSION.contains('+'));
}

#[tokio::test]
async fn console_exchange_over_a_duplex_pipe() {
    let (mut cli, mut daemon) = tokio::io::duplex(1024);

    let request = Request::Console {
        command: "DISPLAY SERVER LEVEL".to_string(),
    };
    send(&mut cli, &request, DEFAULT_TIMEOUT).await.unwrap();
    let got: Request = recv(&mut daemon, DEFAULT_TIMEOUT).await.unwrap();
    assert_eq!(got, request);

    let reply = Response::Console {
        lines: vec!["Server DBSRV level 0.1.0+abc".to_string()],
    };
    send(&mut daemon, &reply, DEFAULT_TIMEOUT).await.unwrap();
    let got: Response = recv(&mut cli, DEFAULT_TIMEOUT).await.unwrap();
    assert_eq!(got, reply);
}

#[tokio::test]
async fn closed_before_prefix_is_connection_closed() {
    let mut empty = std::io::Cursor::new(Vec::<u8>::new());
    let err = read_frame(&mut empty).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed));
}

#[tokio::test]
async fn oversized_prefix_is_refused_before_reading() {
    let mut bytes = ((MAX_FRAME_LEN + 1) as u32).to_be_bytes().to_vec();
    bytes.extend_from_slice(b"{}");
    let err = read_frame(&mut std::io::Cursor::new(bytes)).await.unwrap_err();
    assert!(matches!(err, ProtocolError::FrameTooLarge(len) if len == MAX_FRAME_LEN + 1));
}

#[tokio::test]
async fn unknown_request_type_is_a_json_error() {
    let body = br#"{"type":"Frobnicate"}"#;
    let mut bytes = (body.len() as u32).to_be_bytes().to_vec();
    bytes.extend_from_slice(body);
    let err = recv::<_, Request>(&mut std::io::Cursor::new(bytes), DEFAULT_TIMEOUT)
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Json(_)), "{err}");
}

#[tokio::test]
async fn silent_peer_times_out() {
    let (_cli, mut daemon) = tokio::io::duplex(64);
    let wait = Duration::from_millis(20);
    let err = recv_frame(&mut daemon, wait).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Timeout(d) if d == wait));
}

#[test]
fn stop_mode_displays_as_its_wire_name() {
    for mode in [StopMode::Graceful, StopMode::Immediate] {
        let wire = serde_json::to_value(mode).unwrap();
        assert_eq!(wire, serde_json::Value::String(mode.to_string()));
    }
}
