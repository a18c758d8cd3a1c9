//! Session state machine: anonymous -> authenticating -> authenticated.
//!
//! `SessionManager` owns the access token, the current user identity, and
//! the loading/error flags the UI renders. All mutations go through its
//! operations; reads go through [`SessionSnapshot`] or the individual
//! accessors. Refresh runs behind an in-flight guard so a timer-driven
//! renewal and a 401-driven renewal can never race.

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::api::AuthApi;
use crate::config::Config;
use crate::models::{Identity, TokenGrant};

use super::RefreshScheduler;

/// Read-only view of the session for the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub user: Option<Identity>,
    pub is_loading: bool,
    pub last_error: Option<String>,
    pub is_authenticated: bool,
}

#[derive(Default)]
struct SessionState {
    access_token: Option<String>,
    user: Option<Identity>,
    token_expiry: Option<DateTime<Utc>>,
    is_loading: bool,
    last_error: Option<String>,
    /// Bumped whenever the token is installed or the session cleared.
    /// A refresh caller that queued behind the gate compares generations to
    /// detect that another refresh already resolved while it waited.
    refresh_generation: u64,
}

impl SessionState {
    fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.user.is_some()
    }
}

enum AuthEndpoint {
    Register,
    Login,
}

/// Manages the client auth session.
/// Clone is cheap - the state, scheduler, and API client are shared behind
/// an Arc, so clones observe and mutate the same session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    api: AuthApi,
    state: Mutex<SessionState>,
    scheduler: RefreshScheduler,
    /// Serializes refresh invocations: while one is in flight, a second
    /// trigger waits here instead of issuing a duplicate network call.
    refresh_gate: tokio::sync::Mutex<()>,
}

impl SessionManager {
    pub fn new(api: AuthApi) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                state: Mutex::new(SessionState::default()),
                scheduler: RefreshScheduler::new(),
                refresh_gate: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Convenience constructor building the API client from a config.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(AuthApi::new(config)?))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state();
        SessionSnapshot {
            user: state.user.clone(),
            is_loading: state.is_loading,
            last_error: state.last_error.clone(),
            is_authenticated: state.is_authenticated(),
        }
    }

    /// The current access token, if one is held.
    pub fn access_token(&self) -> Option<String> {
        self.state().access_token.clone()
    }

    /// When the current access token expires.
    pub fn token_expires_at(&self) -> Option<DateTime<Utc>> {
        self.state().token_expiry
    }

    pub fn user(&self) -> Option<Identity> {
        self.state().user.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state().is_loading
    }

    pub fn last_error(&self) -> Option<String> {
        self.state().last_error.clone()
    }

    /// True iff both an access token and a user identity are present.
    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Create an account and start a session with the issued tokens.
    pub async fn register(&self, email: &str, password: &str) -> bool {
        self.authenticate(AuthEndpoint::Register, email, password)
            .await
    }

    /// Exchange credentials for a session.
    pub async fn login(&self, email: &str, password: &str) -> bool {
        self.authenticate(AuthEndpoint::Login, email, password).await
    }

    async fn authenticate(&self, endpoint: AuthEndpoint, email: &str, password: &str) -> bool {
        {
            let mut state = self.state();
            state.is_loading = true;
            state.last_error = None;
        }

        let result = match endpoint {
            AuthEndpoint::Register => self.inner.api.register(email, password).await,
            AuthEndpoint::Login => self.inner.api.login(email, password).await,
        };

        let ok = match result {
            Ok(grant) => {
                self.install_grant(&grant);
                // An identity fetch failure here leaves the session
                // token-only; the credentials were still accepted.
                let _ = self.fetch_identity().await;
                true
            }
            Err(err) => {
                debug!(status = err.status(), "authentication failed");
                self.state().last_error = Some(err.to_string());
                false
            }
        };

        self.state().is_loading = false;
        ok
    }

    /// End the session. The server call is best-effort: local state is
    /// cleared and the refresh timer cancelled regardless of its outcome.
    pub async fn logout(&self) {
        let token = self.access_token();
        if let Err(err) = self.inner.api.logout(token.as_deref()).await {
            debug!(status = err.status(), "logout request failed, clearing local state anyway");
        }
        self.clear();
    }

    /// Attempt silent session restoration from the refresh cookie.
    /// Failure is the normal first-visit case and surfaces no error.
    pub async fn initialize(&self) {
        if self.refresh_tokens().await {
            let _ = self.fetch_identity().await;
        }
    }

    /// Fetch the current user's identity with the held access token.
    ///
    /// A 401 triggers exactly one refresh and one retry; a second
    /// consecutive 401 clears the session instead of looping. Any other
    /// failure returns `None` and leaves the last-known identity in place.
    pub async fn fetch_identity(&self) -> Option<Identity> {
        let mut can_refresh = true;
        loop {
            let token = self.access_token()?;

            match self.inner.api.current_user(&token).await {
                Ok(identity) => {
                    debug!(user_id = %identity.id, "identity fetched");
                    self.state().user = Some(identity.clone());
                    return Some(identity);
                }
                Err(err) if err.is_unauthorized() => {
                    if can_refresh {
                        can_refresh = false;
                        if self.refresh_tokens().await {
                            continue;
                        }
                        // refresh_tokens already cleared the session
                        return None;
                    }
                    warn!("access token rejected immediately after refresh, clearing session");
                    self.clear();
                    return None;
                }
                Err(err) => {
                    debug!(status = err.status(), error = %err, "identity fetch failed, keeping last-known user");
                    return None;
                }
            }
        }
    }

    /// Renew the access token via the refresh cookie.
    ///
    /// Success installs the new token and re-arms the scheduler. Failure is
    /// treated as unrecoverable session loss: the whole session is cleared,
    /// timer included. Concurrent invocations (scheduler firing next to a
    /// 401-driven refresh) serialize behind the gate, and a caller that
    /// waited out another refresh adopts its outcome instead of re-issuing
    /// the call.
    pub async fn refresh_tokens(&self) -> bool {
        let entered_at = self.state().refresh_generation;
        let _gate = self.inner.refresh_gate.lock().await;

        if self.state().refresh_generation != entered_at {
            return self.access_token().is_some();
        }

        match self.inner.api.refresh().await {
            Ok(grant) => {
                self.install_grant(&grant);
                true
            }
            Err(err) => {
                debug!(status = err.status(), "token refresh failed, clearing session");
                self.clear();
                false
            }
        }
    }

    // ========================================================================
    // State transitions
    // ========================================================================

    /// Install an issued token and arm the proactive refresh timer.
    fn install_grant(&self, grant: &TokenGrant) {
        {
            let mut state = self.state();
            state.access_token = Some(grant.access_token.clone());
            state.token_expiry = Some(Utc::now() + Duration::seconds(grant.expires_in));
            state.refresh_generation += 1;
        }

        // When the timer task itself reaches this point (refresh fired and
        // succeeded), arming aborts the task's own handle. That is safe:
        // no suspension points remain on its path to completion.
        let manager = self.clone();
        self.inner.scheduler.arm(
            RefreshScheduler::refresh_delay(grant.expires_in),
            async move {
                manager.refresh_tokens().await;
            },
        );
    }

    /// Reset to the anonymous state and cancel any pending refresh timer.
    fn clear(&self) {
        {
            let mut state = self.state();
            state.access_token = None;
            state.token_expiry = None;
            state.user = None;
            state.last_error = None;
            state.refresh_generation += 1;
        }
        self.inner.scheduler.cancel();
        debug!("session cleared");
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        // Never held across an await; poisoning is recovered since every
        // mutation leaves the state internally consistent.
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
