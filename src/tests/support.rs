use crate::{
    ApiUrl, BearerToken, ClientConfig, SessionContext, VirtClient, VirtConnection, VirtHost,
    VirtPassword, VirtPort, VirtUsername, core::infrastructure::api_client::ApiClient,
};
use std::sync::Arc;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Connection pointing at a wiremock server with test credentials.
pub(crate) fn create_test_connection(server_url: &str) -> VirtConnection {
    let parsed = url::Url::parse(server_url).expect("mock server uri");
    let host = VirtHost::new_unchecked(parsed.host_str().unwrap_or("127.0.0.1").to_string());
    let port = VirtPort::new_unchecked(parsed.port().unwrap_or(80));
    let username = VirtUsername::new_unchecked("testuser".to_string());
    let password = VirtPassword::new_unchecked("testpass".to_string());
    let url = ApiUrl::new_unchecked(format!("{}/", server_url.trim_end_matches('/')));
    VirtConnection::new(host, port, username, password, false, true, url)
}

/// An `ApiClient` that already holds the token `test-token`.
pub(crate) async fn authenticated_client(mock_server: &MockServer, config: ClientConfig) -> ApiClient {
    let session = Arc::new(SessionContext::new(config.token_lifetime));
    session
        .set_token(BearerToken::new_unchecked("test-token".to_string()))
        .await;
    ApiClient::new(create_test_connection(&mock_server.uri()), config, session).unwrap()
}

/// A `VirtClient` aimed at `mock_server`, not yet logged in.
pub(crate) fn client_for(mock_server: &MockServer, config: ClientConfig) -> VirtClient {
    let address = mock_server.address();
    VirtClient::builder()
        .host(address.ip().to_string())
        .port(address.port())
        .credentials("testuser", "testpass")
        .config(config)
        .build()
        .unwrap()
}

/// Mounts a login endpoint handing out `test-token` and logs the client in.
pub(crate) async fn logged_in_client(mock_server: &MockServer, config: ClientConfig) -> VirtClient {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "token": "test-token" }
        })))
        .mount(mock_server)
        .await;

    let client = client_for(mock_server, config);
    client.login().await.unwrap();
    client
}
