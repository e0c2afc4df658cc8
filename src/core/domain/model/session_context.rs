//! The credential context injected into every component that talks to the backend.

use crate::core::domain::{
    error::{VirtError, VirtResult},
    value_object::BearerToken,
};
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tracing::info;

/// Holds the bearer token and broadcasts its expiry.
///
/// Components never look the token up globally: they receive an
/// `Arc<SessionContext>` and subscribe to [`SessionContext::expiry_signal`]
/// to abort their work when the session ends.
#[derive(Debug)]
pub struct SessionContext {
    token: RwLock<Option<BearerToken>>,
    token_lifetime: Duration,
    expired: watch::Sender<bool>,
}

impl SessionContext {
    pub fn new(token_lifetime: Duration) -> Self {
        let (expired, _) = watch::channel(false);
        Self {
            token: RwLock::new(None),
            token_lifetime,
            expired,
        }
    }

    /// Installs a fresh token and clears the expiry flag.
    pub async fn set_token(&self, token: BearerToken) {
        *self.token.write().await = Some(token);
        self.expired.send_replace(false);
    }

    /// Returns the current token, if any.
    pub async fn token(&self) -> Option<BearerToken> {
        self.token.read().await.clone()
    }

    /// Returns `true` if there is a token that has not outlived its lifetime.
    pub async fn is_authenticated(&self) -> bool {
        self.token
            .read()
            .await
            .as_ref()
            .map(|t| !t.is_expired(self.token_lifetime))
            .unwrap_or(false)
    }

    /// Returns the `Authorization` header value, expiring the session if the
    /// token is missing or too old.
    pub async fn authorization(&self) -> VirtResult<String> {
        let header = {
            let guard = self.token.read().await;
            guard
                .as_ref()
                .filter(|t| !t.is_expired(self.token_lifetime))
                .map(BearerToken::as_header_value)
        };
        match header {
            Some(header) => Ok(header),
            None => {
                self.expire().await;
                Err(VirtError::AuthExpired)
            }
        }
    }

    /// Drops the token and notifies every subscriber.
    pub async fn expire(&self) {
        let had_token = self.token.write().await.take().is_some();
        if had_token {
            info!("session expired, re-authentication required");
        }
        self.expired.send_replace(true);
    }

    /// A receiver that flips to `true` when the session expires.
    pub fn expiry_signal(&self) -> watch::Receiver<bool> {
        self.expired.subscribe()
    }

    pub fn is_expired(&self) -> bool {
        *self.expired.borrow()
    }
}
