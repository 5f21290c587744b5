//! Authenticated REST client.
//!
//! Every request carries the current bearer token.  A `401`/`403` response
//! triggers exactly one token refresh through the injected [`RefreshFn`]
//! and one retry; a second rejection is terminal and surfaces as
//! [`ApiError::AuthExpired`].  Token refresh itself (cookies, refresh
//! tokens, whatever the identity service uses) is an opaque external
//! dependency of this crate.

use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{ApiError, Result};

/// Opaque token-refresh hook.  Resolves to a fresh bearer token or fails,
/// in which case the session is considered expired.
pub type RefreshFn = Arc<dyn Fn() -> BoxFuture<'static, Result<String>> + Send + Sync>;

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<String>,
    refresh: RefreshFn,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, refresh: RefreshFn) -> Self {
        let base_url = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(token.into()),
            refresh,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current bearer token (push connection setup needs it too).
    pub async fn bearer_token(&self) -> String {
        self.token.read().await.clone()
    }

    /// Issue an authorized request, refreshing the token and retrying once
    /// on an auth rejection.  Returns the raw response with a success or
    /// not-found status already guaranteed by [`check_status`].
    ///
    /// [`check_status`]: Self::check_status
    pub(crate) async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        let token = self.bearer_token().await;
        let response = self.issue(&method, path, query, body, &token).await?;

        if !is_auth_rejection(response.status()) {
            return self.check_status(response);
        }

        debug!(path, "Bearer token rejected, attempting one refresh");
        let fresh = (self.refresh)().await.map_err(|e| {
            warn!(path, error = %e, "Token refresh failed");
            ApiError::AuthExpired
        })?;
        *self.token.write().await = fresh.clone();

        let retried = self.issue(&method, path, query, body, &fresh).await?;
        if is_auth_rejection(retried.status()) {
            // One refresh, one retry. A second rejection is terminal.
            return Err(ApiError::AuthExpired);
        }
        self.check_status(retried)
    }

    /// Issue an authorized request and decode the JSON body.
    pub(crate) async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<T> {
        let response = self.request(method, path, query, body).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Validation(e.to_string()))
    }

    async fn issue(
        &self,
        method: &Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
        token: &str,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(token)
            .query(query);
        if let Some(json) = body {
            builder = builder.json(json);
        }
        Ok(builder.send().await?)
    }

    fn check_status(&self, response: Response) -> Result<Response> {
        match response.status() {
            StatusCode::NOT_FOUND => Err(ApiError::NotFound),
            status if status.is_success() => Ok(response),
            status => Err(ApiError::Http {
                status: status.as_u16(),
            }),
        }
    }
}

fn is_auth_rejection(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failing_refresh() -> RefreshFn {
        Arc::new(|| Box::pin(async { Err(ApiError::AuthExpired) }))
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("https://api.example.org/", "t", failing_refresh());
        assert_eq!(client.base_url(), "https://api.example.org");
    }

    #[tokio::test]
    async fn test_bearer_token_is_stored() {
        let client = ApiClient::new("https://api.example.org", "tok-1", failing_refresh());
        assert_eq!(client.bearer_token().await, "tok-1");
    }

    #[test]
    fn test_auth_rejection_statuses() {
        assert!(is_auth_rejection(StatusCode::UNAUTHORIZED));
        assert!(is_auth_rejection(StatusCode::FORBIDDEN));
        assert!(!is_auth_rejection(StatusCode::BAD_REQUEST));
        assert!(!is_auth_rejection(StatusCode::OK));
    }
}
