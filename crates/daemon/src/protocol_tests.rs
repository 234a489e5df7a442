// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol unit tests

use std::time::Duration;

use super::*;
use tokio::io::AsyncWriteExt;

#[test]
fn requests_are_tagged_by_type() {
    let request = Request::Cancel {
        item: ItemId::new(12),
    };

    let json: serde_json::Value = serde_json::from_slice(&encode(&request).unwrap()).unwrap();

    assert_eq!(json, serde_json::json!({ "type": "Cancel", "item": 12 }));
}

#[test]
fn schedule_fields_default_when_absent() {
    let request: Request = decode(br#"{"type":"Schedule","task":"compile"}"#).unwrap();

    assert_eq!(
        request,
        Request::Schedule {
            task: "compile".to_string(),
            quiet_period_secs: None,
            parameters: BTreeMap::new(),
            user: None,
        }
    );
}

#[test]
fn status_response_flattens_summary() {
    let response = Response::Status(StatusSummary {
        version: PROTOCOL_VERSION.to_string(),
        uptime_secs: 3600,
        queued: 4,
        buildable: 1,
        executors_busy: 2,
        executors_total: 2,
        quieting_down: false,
    });

    let encoded = encode(&response).unwrap();
    let json: serde_json::Value = serde_json::from_slice(&encoded).unwrap();

    assert_eq!(json["type"], "Status");
    assert_eq!(json["queued"], 4);
    assert_eq!(decode::<Response>(&encoded).unwrap(), response);
}

#[test]
fn finished_omits_missing_result() {
    let response = Response::Finished {
        item: ItemId::new(3),
        result: None,
        error: Some("cancelled".to_string()),
    };

    let json: serde_json::Value = serde_json::from_slice(&encode(&response).unwrap()).unwrap();

    assert_eq!(
        json,
        serde_json::json!({ "type": "Finished", "item": 3, "error": "cancelled" })
    );
}

#[test]
fn interrupt_result_uses_screaming_case() {
    let request: Request = decode(
        br#"{"type":"Interrupt","computer":"built-in","executor":0,"result":"ABORTED"}"#,
    )
    .unwrap();

    assert!(matches!(
        request,
        Request::Interrupt {
            result: BuildResult::Aborted,
            user: None,
            ..
        }
    ));
}

#[tokio::test]
async fn frames_carry_length_prefix() {
    let (mut client, mut server) = tokio::io::duplex(1024);

    write_request(&mut client, &Request::Ping, DEFAULT_TIMEOUT)
        .await
        .unwrap();
    let raw = read_message(&mut server).await.unwrap();

    assert_eq!(raw, br#"{"type":"Ping"}"#.to_vec());
}

#[tokio::test]
async fn request_and_response_cross_the_wire() {
    let (mut client, mut server) = tokio::io::duplex(4096);
    let request = Request::Schedule {
        task: "deploy".to_string(),
        quiet_period_secs: Some(5),
        parameters: BTreeMap::from([("env".to_string(), "prod".to_string())]),
        user: Some("alice".to_string()),
    };

    write_request(&mut client, &request, DEFAULT_TIMEOUT)
        .await
        .unwrap();
    assert_eq!(
        read_request(&mut server, DEFAULT_TIMEOUT).await.unwrap(),
        request
    );

    let response = Response::Scheduled {
        item: ItemId::new(9),
        created: true,
    };
    write_response(&mut server, &response, DEFAULT_TIMEOUT)
        .await
        .unwrap();
    assert_eq!(read_response(&mut client, None).await.unwrap(), response);
}

#[tokio::test]
async fn closed_connection_is_reported() {
    let (client, mut server) = tokio::io::duplex(64);
    drop(client);

    let err = read_message(&mut server).await.unwrap_err();

    assert!(matches!(err, ProtocolError::ConnectionClosed));
}

#[tokio::test]
async fn oversized_frame_is_rejected() {
    let (mut client, mut server) = tokio::io::duplex(64);
    let len = (MAX_MESSAGE_SIZE as u32) + 1;
    client.write_all(&len.to_be_bytes()).await.unwrap();

    let err = read_message(&mut server).await.unwrap_err();

    assert!(matches!(err, ProtocolError::MessageTooLarge { size, .. } if size == len as usize));
}

#[tokio::test(start_paused = true)]
async fn silent_peer_times_out() {
    let (_client, mut server) = tokio::io::duplex(64);

    let err = read_request(&mut server, Duration::from_secs(1))
        .await
        .unwrap_err();

    assert!(matches!(err, ProtocolError::Timeout));
}
