// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fm_daemon::protocol::{read_request, write_response, DEFAULT_TIMEOUT};
use serial_test::serial;
use tempfile::{tempdir, TempDir};
use tokio::net::UnixListener;
use tokio::task::JoinHandle;

/// Answer one request with `response`; the join handle yields the request.
fn serve_once(response: Response) -> (TempDir, DaemonClient, JoinHandle<Request>) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("daemon.sock");
    let listener = UnixListener::bind(&path).unwrap();
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (mut reader, mut writer) = stream.into_split();
        let request = read_request(&mut reader, DEFAULT_TIMEOUT).await.unwrap();
        write_response(&mut writer, &response, DEFAULT_TIMEOUT)
            .await
            .unwrap();
        request
    });
    (dir, DaemonClient::at(path), server)
}

#[tokio::test]
async fn schedule_sends_task_and_parameters() {
    let (_dir, client, server) = serve_once(Response::Scheduled {
        item: ItemId::new(4),
        created: false,
    });
    let params = BTreeMap::from([("branch".to_string(), "main".to_string())]);

    let scheduled = client
        .schedule("compile", Some(30), params.clone(), Some("alice".to_string()))
        .await
        .unwrap();

    assert_eq!(
        scheduled,
        Scheduled {
            item: ItemId::new(4),
            created: false
        }
    );
    assert_eq!(
        server.await.unwrap(),
        Request::Schedule {
            task: "compile".to_string(),
            quiet_period_secs: Some(30),
            parameters: params,
            user: Some("alice".to_string()),
        }
    );
}

#[tokio::test]
async fn daemon_error_becomes_rejected() {
    let (_dir, client, _server) = serve_once(Response::Error {
        message: "unknown task: nope".to_string(),
    });

    let err = client
        .schedule("nope", None, BTreeMap::new(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Rejected(ref m) if m == "unknown task: nope"));
    assert_eq!(err.to_string(), "unknown task: nope");
}

#[tokio::test]
async fn mismatched_response_is_unexpected() {
    let (_dir, client, _server) = serve_once(Response::Pong);

    let err = client.cancel(ItemId::new(1)).await.unwrap_err();

    assert!(matches!(err, ClientError::UnexpectedResponse));
}

#[tokio::test]
async fn wait_reports_result_or_reason() {
    let (_dir, client, _server) = serve_once(Response::Finished {
        item: ItemId::new(2),
        result: Some(BuildResult::Unstable),
        error: None,
    });
    assert_eq!(
        client.wait(ItemId::new(2)).await.unwrap(),
        Finished::Built(BuildResult::Unstable)
    );

    let (_dir, client, _server) = serve_once(Response::Finished {
        item: ItemId::new(3),
        result: None,
        error: Some("cancelled".to_string()),
    });
    assert_eq!(
        client.wait(ItemId::new(3)).await.unwrap(),
        Finished::NotRun("cancelled".to_string())
    );
}

#[tokio::test]
async fn quiet_down_expects_ok() {
    let (_dir, client, server) = serve_once(Response::Ok);

    client.quiet_down(false).await.unwrap();

    assert_eq!(server.await.unwrap(), Request::QuietDown { on: false });
}

#[tokio::test]
async fn missing_socket_is_not_running() {
    let dir = tempdir().unwrap();
    let client = DaemonClient::at(dir.path().join("daemon.sock"));

    let err = client.status().await.unwrap_err();

    assert!(err.is_not_running());
}

#[test]
#[serial]
fn connect_without_socket_fails() {
    let dir = tempdir().unwrap();
    std::env::set_var("FM_STATE_DIR", dir.path());

    let result = DaemonClient::connect();

    std::env::remove_var("FM_STATE_DIR");
    assert!(matches!(result, Err(ClientError::DaemonNotRunning)));
}

#[test]
#[serial]
fn timeouts_follow_env() {
    std::env::set_var("FM_TIMEOUT_IPC_MS", "250");
    std::env::remove_var("FM_CONNECT_POLL_MS");

    assert_eq!(timeout_ipc(), Duration::from_millis(250));
    assert_eq!(poll_interval(), Duration::from_millis(50));

    std::env::set_var("FM_TIMEOUT_IPC_MS", "not a number");
    assert_eq!(timeout_ipc(), Duration::from_secs(5));
    std::env::remove_var("FM_TIMEOUT_IPC_MS");
}
