//! Session bridge over an external identity provider.
//!
//! The provider (Firebase in production) owns credentials and tokens; this
//! module reduces its session-change notifications to a single
//! `{user, loading}` value and wraps every credential operation in a uniform
//! outcome so calling code never branches on provider-specific errors.
//!
//! `loading` is distinct from "signed out": while the initial session check
//! is running, dependent fetches must be suspended (spinner), not treated as
//! unauthenticated (login prompt).

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::domain::Identity;

/// External identity provider seam. Errors are already user-facing message
/// strings; provider exception types stop at the implementation.
#[allow(async_fn_in_trait)]
pub trait IdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, String>;
    async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<Identity, String>;
    async fn sign_in_with_google(&self) -> Result<Identity, String>;
    async fn sign_out(&self) -> Result<(), String>;
    /// Current bearer token, or `None` when signed out. `force_refresh`
    /// mints a fresh token even if a cached one is still nominally valid.
    async fn id_token(&self, force_refresh: bool) -> Result<Option<String>, String>;
}

#[derive(Clone, Debug)]
pub struct SessionState {
    pub user: Option<Identity>,
    /// True until the first session notification arrives.
    pub loading: bool,
}

impl SessionState {
    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    /// Protected fetches may run only with a settled, signed-in session.
    pub fn fetches_enabled(&self) -> bool {
        !self.loading && self.user.is_some()
    }
}

/// Uniform result for every credential operation.
#[derive(Clone, Debug)]
pub struct AuthOutcome {
    pub success: bool,
    pub user: Option<Identity>,
    pub error: Option<String>,
}

impl AuthOutcome {
    fn ok(user: Option<Identity>) -> Self {
        Self { success: true, user, error: None }
    }

    fn err(message: String, fallback: &str) -> Self {
        let message = if message.is_empty() { fallback.to_string() } else { message };
        Self { success: false, user: None, error: Some(message) }
    }
}

pub struct SessionBridge<P> {
    provider: Arc<P>,
    state: RwLock<SessionState>,
}

impl<P: IdentityProvider> SessionBridge<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            state: RwLock::new(SessionState { user: None, loading: true }),
        }
    }

    pub fn provider(&self) -> Arc<P> {
        self.provider.clone()
    }

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// Feed a session-change notification from the provider's observer. The
    /// first notification settles `loading` regardless of sign-in state.
    pub async fn on_session_changed(&self, user: Option<Identity>) {
        let mut state = self.state.write().await;
        info!(target: "auth", logged_in = user.is_some(), "Session changed");
        *state = SessionState { user, loading: false };
    }

    #[instrument(level = "info", skip(self, password), fields(%email))]
    pub async fn login(&self, email: &str, password: &str) -> AuthOutcome {
        match self.provider.sign_in(email, password).await {
            Ok(user) => {
                self.on_session_changed(Some(user.clone())).await;
                AuthOutcome::ok(Some(user))
            }
            Err(e) => {
                warn!(target: "auth", error = %e, "Sign-in rejected");
                AuthOutcome::err(e, "Failed to sign in. Please check your credentials.")
            }
        }
    }

    #[instrument(level = "info", skip(self, password, name), fields(%email))]
    pub async fn signup(&self, email: &str, password: &str, name: &str) -> AuthOutcome {
        match self.provider.sign_up(email, password, name).await {
            Ok(user) => {
                self.on_session_changed(Some(user.clone())).await;
                AuthOutcome::ok(Some(user))
            }
            Err(e) => {
                warn!(target: "auth", error = %e, "Sign-up rejected");
                AuthOutcome::err(e, "Failed to create account. Please try again.")
            }
        }
    }

    #[instrument(level = "info", skip(self))]
    pub async fn login_with_google(&self) -> AuthOutcome {
        match self.provider.sign_in_with_google().await {
            Ok(user) => {
                self.on_session_changed(Some(user.clone())).await;
                AuthOutcome::ok(Some(user))
            }
            Err(e) => {
                warn!(target: "auth", error = %e, "Google sign-in rejected");
                AuthOutcome::err(e, "Failed to sign in with Google. Please try again.")
            }
        }
    }

    #[instrument(level = "info", skip(self))]
    pub async fn logout(&self) -> AuthOutcome {
        match self.provider.sign_out().await {
            Ok(()) => {
                self.on_session_changed(None).await;
                AuthOutcome::ok(None)
            }
            Err(e) => {
                warn!(target: "auth", error = %e, "Sign-out failed");
                AuthOutcome::err(e, "Failed to sign out.")
            }
        }
    }
}
