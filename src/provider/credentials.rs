//! Credential capability for the search provider
//!
//! Tokens are injected into the provider rather than held in global state.
//! [`CachedCredentials`] keeps one token and refreshes it shortly before it
//! expires.

use crate::provider::TransportError;
use crate::ConfigError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

/// Supplies the bearer token (if any) for each search call
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn bearer_token(&self) -> Result<Option<String>, TransportError>;
}

/// A fixed token, or no authentication at all
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    pub fn none() -> Self {
        Self { token: None }
    }

    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// Reads the token from an environment variable
    pub fn from_env(var: &str) -> Result<Self, ConfigError> {
        match std::env::var(var) {
            Ok(token) if !token.trim().is_empty() => Ok(Self::new(token.trim())),
            _ => Err(ConfigError::Validation(format!(
                "environment variable {} is not set",
                var
            ))),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn bearer_token(&self) -> Result<Option<String>, TransportError> {
        Ok(self.token.clone())
    }
}

/// An access token with its expiry
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Returns true if the token is still valid `margin` from `now`
    pub fn is_fresh(&self, margin: Duration, now: DateTime<Utc>) -> bool {
        now + margin < self.expires_at
    }
}

/// Obtains new access tokens (e.g. an OAuth client-credentials exchange)
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_token(&self) -> Result<AccessToken, TransportError>;
}

/// Caches a token from a [`TokenSource`], refreshing before expiry
pub struct CachedCredentials<S> {
    source: S,
    refresh_margin: Duration,
    cached: Mutex<Option<AccessToken>>,
}

impl<S: TokenSource> CachedCredentials<S> {
    /// Creates a cache that refreshes 60 seconds before expiry
    pub fn new(source: S) -> Self {
        Self::with_margin(source, Duration::seconds(60))
    }

    pub fn with_margin(source: S, refresh_margin: Duration) -> Self {
        Self {
            source,
            refresh_margin,
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl<S: TokenSource> CredentialProvider for CachedCredentials<S> {
    async fn bearer_token(&self) -> Result<Option<String>, TransportError> {
        // Held across the refresh so concurrent callers share one fetch
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.is_fresh(self.refresh_margin, Utc::now()) {
                return Ok(Some(token.value.clone()));
            }
            tracing::debug!("Access token expires at {}, refreshing", token.expires_at);
        }

        let token = self.source.fetch_token().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(Some(value))
    }
}
