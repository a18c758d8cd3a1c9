//! HTTP client for the auth server endpoints.

use std::time::Duration;

use anyhow::Result;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::config::Config;
use crate::models::{Identity, TokenGrant};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// Auth calls are small; 30s tolerates a slow server while still failing
/// fast enough for an interactive login form.
const REQUEST_TIMEOUT_SECS: u64 = 30;

const REGISTER_PATH: &str = "/api/auth/register";
const LOGIN_PATH: &str = "/api/auth/login";
const LOGOUT_PATH: &str = "/api/auth/logout";
const REFRESH_PATH: &str = "/api/auth/refresh";
const ME_PATH: &str = "/api/user/me";

/// Error response body shape used by the auth server
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Client for the auth server.
/// Clone is cheap - reqwest::Client uses Arc internally, and the shared
/// cookie store is what carries the long-lived refresh credential between
/// calls.
#[derive(Clone)]
pub struct AuthApi {
    client: Client,
    base_url: String,
}

impl AuthApi {
    /// Create a new client for the configured server.
    ///
    /// The cookie store must be enabled: the refresh endpoint authenticates
    /// via the httpOnly cookie set during register/login, not the access
    /// token.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register a new account. The server issues tokens immediately on
    /// success, so this doubles as a login.
    pub async fn register(&self, email: &str, password: &str) -> Result<TokenGrant, ApiError> {
        let request = self
            .client
            .post(self.url(REGISTER_PATH))
            .json(&serde_json::json!({ "email": email, "password": password }));
        Self::execute(request).await
    }

    /// Exchange credentials for an access token and a refresh cookie.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenGrant, ApiError> {
        let request = self
            .client
            .post(self.url(LOGIN_PATH))
            .json(&serde_json::json!({ "email": email, "password": password }));
        Self::execute(request).await
    }

    /// Invalidate the server-side session. The refresh cookie is cleared by
    /// the server's response; the caller discards local state regardless of
    /// the outcome here.
    pub async fn logout(&self, access_token: Option<&str>) -> Result<(), ApiError> {
        let mut request = self.client.post(self.url(LOGOUT_PATH));
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }
        Self::execute_no_content(request).await
    }

    /// Obtain a fresh access token using the refresh cookie.
    pub async fn refresh(&self) -> Result<TokenGrant, ApiError> {
        Self::execute(self.client.post(self.url(REFRESH_PATH))).await
    }

    /// Fetch the authenticated user's identity.
    pub async fn current_user(&self, access_token: &str) -> Result<Identity, ApiError> {
        let request = self.client.get(self.url(ME_PATH)).bearer_auth(access_token);
        Self::execute(request).await
    }

    /// Perform a request and normalize the result: parsed body on 2xx,
    /// `ApiError::Api` on any other status, `ApiError::Network` when no
    /// status was obtained.
    async fn execute<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await.map_err(ApiError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_from_response(response).await);
        }

        response.json().await.map_err(ApiError::Network)
    }

    /// Like `execute`, for endpoints whose success response carries no body.
    async fn execute_no_content(request: RequestBuilder) -> Result<(), ApiError> {
        let response = request.send().await.map_err(ApiError::Network)?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        Ok(())
    }

    /// Build an application error from a non-2xx response, using the body's
    /// `error` field when present and a generic message otherwise.
    async fn error_from_response(response: reqwest::Response) -> ApiError {
        let status = response.status();
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error)
            .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));

        debug!(status = status.as_u16(), message = %message, "API request failed");
        ApiError::Api { message, status }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_for(server: &MockServer) -> AuthApi {
        AuthApi::new(&Config::new(server.uri())).expect("client should build")
    }

    #[tokio::test]
    async fn test_login_parses_token_grant() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .and(body_json(json!({"email": "user@x.com", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "t1",
                "expires_in": 3600
            })))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let grant = api.login("user@x.com", "pw").await.expect("login should succeed");
        assert_eq!(grant.access_token, "t1");
        assert_eq!(grant.expires_in, 3600);
    }

    #[tokio::test]
    async fn test_current_user_sends_bearer_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/user/me"))
            .and(header("Authorization", "Bearer t1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "u1",
                "email": "user@x.com"
            })))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let identity = api.current_user("t1").await.expect("fetch should succeed");
        assert_eq!(identity.id, "u1");
        assert_eq!(identity.email, "user@x.com");
    }

    #[tokio::test]
    async fn test_structured_error_body_is_surfaced() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "invalid email or password"
            })))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let err = api.login("user@x.com", "bad").await.expect_err("login should fail");
        assert_eq!(err.to_string(), "invalid email or password");
        assert_eq!(err.status(), 401);
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_unparseable_error_body_falls_back_to_generic_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let err = api.login("user@x.com", "pw").await.expect_err("login should fail");
        assert_eq!(err.to_string(), "Request failed with status 500");
        assert_eq!(err.status(), 500);
    }

    #[tokio::test]
    async fn test_transport_failure_has_status_sentinel_zero() {
        // Grab a port with nothing listening on it. An exclusive (builder)
        // server is required: pooled servers keep listening after drop.
        let server = MockServer::builder().start().await;
        let uri = server.uri();
        drop(server);

        let api = AuthApi::new(&Config::new(uri)).expect("client should build");
        let err = api.refresh().await.expect_err("refresh should fail");
        assert_eq!(err.status(), 0);
        assert_eq!(err.to_string(), "Network error. Please try again.");
        assert!(!err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_logout_tolerates_empty_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/auth/logout"))
            .and(header("Authorization", "Bearer t1"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let api = api_for(&server);
        api.logout(Some("t1")).await.expect("logout should succeed");
    }
}
