use crate::{
    BearerToken, VirtConnection, VirtError, VirtResult, ValidationError,
    auth::application::{
        request::login_request::LoginRequest, response::login_response::LoginResponse,
    },
    core::domain::value_object::validate_token,
};

use reqwest::{
    Client, StatusCode,
    header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use std::time::Duration;
use tracing::{info, warn};

/// Exchanges the connection's credentials for a bearer token.
pub struct LoginService {
    default_headers: HeaderMap,
    timeout: Duration,
}

impl LoginService {
    pub fn new(timeout: Duration) -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Self {
            default_headers,
            timeout,
        }
    }

    pub async fn execute(&self, connection: &VirtConnection) -> VirtResult<BearerToken> {
        let http_client = Client::builder()
            .danger_accept_invalid_certs(connection.accepts_invalid_certs())
            .timeout(self.timeout)
            .build()
            .map_err(|e| VirtError::Connection(e.to_string()))?;
        let url = connection.url().join_segments(&["auth", "login"])?;
        let request = LoginRequest {
            username: connection.username().as_str().to_string(),
            password: connection.password().as_str().to_string(),
        };
        let response = self.send_request(&http_client, &url, &request).await?;

        match response.status() {
            StatusCode::OK => {
                let token = self.handle_successful_login(response).await?;
                info!(username = connection.username().as_str(), "login succeeded");
                Ok(token)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                warn!(username = connection.username().as_str(), "login rejected");
                Err(VirtError::Authentication(
                    "Invalid credentials provided".to_string(),
                ))
            }
            StatusCode::BAD_REQUEST => Err(ValidationError::Field {
                field: "request".to_string(),
                message: "Invalid request format".to_string(),
            }
            .into()),
            StatusCode::NOT_FOUND => Err(VirtError::Connection(
                "Login endpoint not found".to_string(),
            )),
            StatusCode::SERVICE_UNAVAILABLE => Err(VirtError::Connection(
                "Backend service is currently unavailable".to_string(),
            )),
            status => Err(VirtError::Connection(format!(
                "Unexpected response status: {}",
                status
            ))),
        }
    }

    async fn send_request(
        &self,
        client: &Client,
        url: &str,
        request: &LoginRequest,
    ) -> VirtResult<reqwest::Response> {
        client
            .post(url)
            .headers(self.default_headers.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VirtError::Timeout("login request timed out".to_string())
                } else {
                    VirtError::Connection(e.to_string())
                }
            })
    }

    async fn handle_successful_login(&self, response: reqwest::Response) -> VirtResult<BearerToken> {
        let login_response = response.json::<LoginResponse>().await.map_err(|e| {
            VirtError::Connection(format!("Failed to parse login response: {}", e))
        })?;

        validate_token(&login_response.data.token)?;
        Ok(BearerToken::new_unchecked(login_response.data.token))
    }
}

impl Default for LoginService {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}
