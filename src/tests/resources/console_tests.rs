use crate::{
    ClientConfig, VirtError, VmIdentity,
    console::session_manager::ConsoleStatus,
    tests::support::logged_in_client,
};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

/// Accepts one connection, greets with an RFB banner and reports when the
/// client hangs up.
async fn fake_display_server() -> (u16, oneshot::Receiver<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket.write_all(b"RFB 003.008\n").await.unwrap();
        let mut received = Vec::new();
        // Returns once the client closes its side.
        socket.read_to_end(&mut received).await.unwrap();
        let _ = tx.send(received);
    });
    (port, rx)
}

async fn mount_details(server: &MockServer, vm: &str, state: u8) {
    Mock::given(method("GET"))
        .and(path(format!("/virt/domain/{}/details", vm)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "state": state,
                "cpu_time": 1.0,
                "memory_usage": 1024,
                "max_memory": 2048,
                "cpuCount": 1
            }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_console_open_send_and_close() {
    let mock_server = MockServer::start().await;
    let client = logged_in_client(&mock_server, ClientConfig::default()).await;
    let (port, hung_up) = fake_display_server().await;

    mount_details(&mock_server, "web01", 1).await;
    Mock::given(method("GET"))
        .and(path("/virt/domain/web01/console"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "host": "127.0.0.1", "port": port }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let web01 = VmIdentity::from("web01");
    let mut console = client.console_manager();
    let session = console.open(&web01).await.unwrap();
    assert_eq!(session.protocol_version(), "003.008");
    assert_eq!(session.endpoint().port, port);

    console.send(b"\x03\x00").await.unwrap();
    console.close().await;
    assert_eq!(console.status(), ConsoleStatus::Closed);

    let received = tokio::time::timeout(Duration::from_secs(5), hung_up)
        .await
        .expect("display server saw the hang-up")
        .unwrap();
    assert_eq!(received, b"\x03\x00");
}

#[tokio::test]
async fn test_console_refused_for_stopped_vm() {
    let mock_server = MockServer::start().await;
    let client = logged_in_client(&mock_server, ClientConfig::default()).await;

    mount_details(&mock_server, "db1", 5).await;
    Mock::given(method("GET"))
        .and(path("/virt/domain/db1/console"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let db1 = VmIdentity::from("db1");
    let mut console = client.console_manager();
    let result = console.open(&db1).await;
    assert!(matches!(result, Err(VirtError::ConsoleSession(_))));
    assert!(matches!(console.status(), ConsoleStatus::Failed { .. }));
}

#[tokio::test]
async fn test_console_unreachable_display_is_terminal() {
    let mock_server = MockServer::start().await;
    let client = logged_in_client(&mock_server, ClientConfig::default()).await;

    // Reserve a port, then free it so nothing listens there.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    mount_details(&mock_server, "web01", 1).await;
    Mock::given(method("GET"))
        .and(path("/virt/domain/web01/console"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "host": "127.0.0.1", "port": port }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let web01 = VmIdentity::from("web01");
    let mut console = client.console_manager();
    assert!(console.open(&web01).await.is_err());
    // Not retried until the view is closed.
    assert!(matches!(
        console.open(&web01).await,
        Err(VirtError::ConsoleSession(_))
    ));
}
