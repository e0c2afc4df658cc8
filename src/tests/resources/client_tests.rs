use crate::{
    ClientConfig, ValidationError, VirtClient, VirtError,
    tests::support::{client_for, logged_in_client},
};
use std::time::Duration;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};

#[test]
fn test_builder_requires_host() {
    let result = VirtClient::builder().credentials("admin", "secret").build();
    match result {
        Err(VirtError::Validation {
            source: ValidationError::Field { field, .. },
        }) => assert_eq!(field, "host"),
        other => panic!("unexpected result: {:?}", other.err()),
    }
}

#[test]
fn test_builder_requires_credentials() {
    let result = VirtClient::builder().host("virt.example.com").build();
    assert!(matches!(result, Err(VirtError::Validation { .. })));
}

#[test]
fn test_builder_rejects_invalid_values() {
    let bad_host = VirtClient::builder()
        .host("-bad-.example")
        .credentials("admin", "secret")
        .build();
    assert!(bad_host.is_err());

    let bad_port = VirtClient::builder()
        .host("virt.example.com")
        .port(0)
        .credentials("admin", "secret")
        .build();
    assert!(bad_port.is_err());

    let zero_timeout = VirtClient::builder()
        .host("virt.example.com")
        .credentials("admin", "secret")
        .config(ClientConfig {
            action_timeout: Duration::ZERO,
            ..Default::default()
        })
        .build();
    assert!(zero_timeout.is_err());

    let reserved = VirtClient::builder()
        .host("virt.example.com")
        .credentials("root", "secret")
        .config(ClientConfig {
            block_reserved_usernames: true,
            ..Default::default()
        })
        .build();
    assert!(reserved.is_err());
}

#[test]
fn test_builder_defaults() {
    let client = VirtClient::builder()
        .host("virt.example.com")
        .credentials("admin", "secret")
        .build()
        .unwrap();

    assert_eq!(client.connection().port().get(), 8000);
    assert_eq!(client.connection().url().as_str(), "http://virt.example.com:8000/");
    assert!(!client.session().is_expired());
}

#[tokio::test]
async fn test_login_then_authorized_request_then_logout() {
    let mock_server = MockServer::start().await;
    let client = logged_in_client(&mock_server, ClientConfig::default()).await;
    assert!(client.is_authenticated().await);

    Mock::given(method("GET"))
        .and(path("/host/disk"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "total": 1000, "used": 250, "free": 750 }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let disk = client.host_disk().await.unwrap();
    assert_eq!(disk.used, 250);

    let signal = client.session().expiry_signal();
    client.logout().await;
    assert!(!client.is_authenticated().await);
    assert!(*signal.borrow());

    let result = client.host_disk().await;
    assert!(matches!(result, Err(VirtError::AuthExpired)));
}

#[tokio::test]
async fn test_rejected_login() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, ClientConfig::default());
    let result = client.login().await;
    assert!(matches!(result, Err(VirtError::Authentication(_))));
    assert!(!client.is_authenticated().await);
}
