use crate::{
    ClientConfig, VirtBackend, VirtError,
    tests::support::{authenticated_client, init_tracing, logged_in_client},
};
use std::time::Duration;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

async fn mount_json(server: &MockServer, route: &str, data: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": data })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_host_endpoints() {
    let mock_server = MockServer::start().await;
    let client = authenticated_client(&mock_server, ClientConfig::default()).await;

    mount_json(
        &mock_server,
        "/host/cpu",
        serde_json::json!({ "cpu_time": 123456.5, "cpu_count": 8 }),
    )
    .await;
    mount_json(
        &mock_server,
        "/host/mem",
        serde_json::json!({ "total": 16384000, "used": 4096000, "free": 12288000 }),
    )
    .await;
    mount_json(
        &mock_server,
        "/host/info",
        serde_json::json!({
            "hostname": "virt-01",
            "kernel": "6.1.0-18-amd64",
            "cpu_count": 8
        }),
    )
    .await;

    let cpu = client.host_cpu().await.unwrap();
    assert_eq!(cpu.cpu_count, 8);
    assert!((cpu.cpu_time - 123456.5).abs() < f64::EPSILON);

    let memory = client.host_memory().await.unwrap();
    assert_eq!(memory.total, 16384000);
    assert_eq!(memory.available, None);

    let info = client.host_info().await.unwrap();
    assert_eq!(info.hostname, "virt-01");
    assert_eq!(info.kernel.as_deref(), Some("6.1.0-18-amd64"));
    assert_eq!(info.os, None);
}

#[tokio::test]
async fn test_host_endpoint_failure() {
    let mock_server = MockServer::start().await;
    let client = authenticated_client(&mock_server, ClientConfig::default()).await;

    Mock::given(method("GET"))
        .and(path("/host/disk"))
        .respond_with(ResponseTemplate::new(503).set_body_string("disk stats unavailable"))
        .mount(&mock_server)
        .await;

    let result = client.host_disk().await;
    match result {
        Err(e @ VirtError::Api { status: 503, .. }) => assert!(e.is_transient()),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_host_monitor_publishes_telemetry() {
    init_tracing();
    let mock_server = MockServer::start().await;
    let client = logged_in_client(
        &mock_server,
        ClientConfig {
            host_poll_interval: Duration::from_millis(50),
            ..Default::default()
        },
    )
    .await;

    mount_json(
        &mock_server,
        "/host/cpu",
        serde_json::json!({ "cpu_time": 10.0, "cpu_count": 4 }),
    )
    .await;
    mount_json(
        &mock_server,
        "/host/mem",
        serde_json::json!({ "total": 1000, "used": 250, "free": 750 }),
    )
    .await;
    mount_json(
        &mock_server,
        "/host/disk",
        serde_json::json!({ "total": 1000, "used": 900, "free": 100 }),
    )
    .await;
    mount_json(&mock_server, "/host/info", serde_json::json!({ "hostname": "virt-01" })).await;

    let monitor = client.host_monitor();
    let mut updates = monitor.subscribe();
    tokio::time::timeout(Duration::from_secs(5), updates.wait_for(|t| t.is_some()))
        .await
        .expect("telemetry within 5s")
        .unwrap();

    let telemetry = monitor.latest().unwrap();
    assert!((telemetry.memory.percent() - 25.0).abs() < 1e-9);
    assert!((telemetry.disk.percent() - 90.0).abs() < 1e-9);
    // Constant counter: no CPU activity.
    assert_eq!(telemetry.cpu.percent(), 0.0);
    assert_eq!(telemetry.info.hostname, "virt-01");
}
