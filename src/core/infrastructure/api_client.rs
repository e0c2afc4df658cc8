//! Internal HTTP client that attaches the session credential and maps backend failures.

use crate::core::domain::{
    error::{VirtError, VirtResult},
    model::{
        api_response::ApiResponse, client_config::ClientConfig, connection::VirtConnection,
        session_context::SessionContext,
    },
};
use governor::{DefaultDirectRateLimiter, Quota};
use reqwest::{Client, StatusCode, header::AUTHORIZATION};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, warn};

/// Internal HTTP client that manages authentication and provides methods to call the backend.
///
/// Every request carries `Authorization: Bearer <token>` taken from the injected
/// [`SessionContext`]. A `401 Unauthorized` response expires that context (which
/// aborts every polling loop subscribed to it) and is returned as
/// [`VirtError::AuthExpired`]; there is no silent re-login.
#[derive(Debug)]
pub struct ApiClient {
    http_client: Client,
    connection: Arc<VirtConnection>,
    session: Arc<SessionContext>,
    config: Arc<ClientConfig>,
    rate_limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl ApiClient {
    /// Creates a new `ApiClient` bound to `session`.
    ///
    /// # Errors
    /// Returns `VirtError::Connection` if the HTTP client cannot be built.
    pub fn new(
        connection: VirtConnection,
        config: ClientConfig,
        session: Arc<SessionContext>,
    ) -> VirtResult<Self> {
        let http_client = Client::builder()
            .danger_accept_invalid_certs(connection.accepts_invalid_certs())
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| VirtError::Connection(e.to_string()))?;

        let rate_limiter = config.rate_limit.and_then(|rl| {
            let per_second = NonZeroU32::new(rl.requests_per_second)?;
            let burst = NonZeroU32::new(rl.burst_size)?;
            let quota = Quota::per_second(per_second).allow_burst(burst);
            Some(Arc::new(DefaultDirectRateLimiter::direct(quota)))
        });

        Ok(Self {
            http_client,
            connection: Arc::new(connection),
            session,
            config: Arc::new(config),
            rate_limiter,
        })
    }

    /// Returns a reference to the underlying connection details.
    pub fn connection(&self) -> &VirtConnection {
        &self.connection
    }

    /// Returns the injected session context.
    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Performs an authenticated GET request and unwraps the `data` envelope.
    ///
    /// `path` is given as raw segments; each one is percent-encoded.
    ///
    /// # Errors
    /// Returns `VirtError` if the request fails, the session is expired,
    /// or the response cannot be parsed.
    pub async fn get<T>(&self, path: &[&str]) -> VirtResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .execute_request(reqwest::Method::GET, path, None::<&()>)
            .await?;
        Self::parse(response).await
    }

    /// Performs an authenticated POST request whose response body is irrelevant.
    ///
    /// # Errors
    /// Returns `VirtError` if the request fails or the session is expired.
    pub async fn post_command<B>(&self, path: &[&str], body: &B) -> VirtResult<()>
    where
        B: serde::Serialize,
    {
        self.execute_request(reqwest::Method::POST, path, Some(body))
            .await
            .map(|_| ())
    }

    /// Core request execution: rate limiting, credential, status mapping.
    async fn execute_request<B>(
        &self,
        method: reqwest::Method,
        path: &[&str],
        body: Option<&B>,
    ) -> VirtResult<reqwest::Response>
    where
        B: serde::Serialize,
    {
        let url = self.connection.url().join_segments(path)?;
        let authorization = self.session.authorization().await?;

        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        debug!(%method, %url, "sending request");

        let mut req_builder = self
            .http_client
            .request(method, &url)
            .header(AUTHORIZATION, authorization);

        if let Some(body) = body {
            req_builder = req_builder.json(body);
        }

        let response = req_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                VirtError::Timeout(format!("request to {} timed out", url))
            } else {
                VirtError::Connection(format!("HTTP request failed: {}", e))
            }
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!(%url, "backend rejected credential");
            self.session.expire().await;
            return Err(VirtError::AuthExpired);
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(VirtError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        Ok(response)
    }

    async fn parse<T>(response: reqwest::Response) -> VirtResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        response
            .json::<ApiResponse<T>>()
            .await
            .map(|envelope| envelope.data)
            .map_err(|e| VirtError::Connection(format!("Failed to parse response: {}", e)))
    }
}
