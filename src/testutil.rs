//! Shared test doubles: an in-memory identity provider with a scripted
//! token sequence so tests can count forced refreshes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::auth::IdentityProvider;
use crate::domain::Identity;

#[derive(Default)]
pub struct MockProvider {
    /// Tokens handed out in order; a forced refresh advances to the next one
    /// (the last token repeats). Empty means signed out.
    pub tokens: Mutex<Vec<String>>,
    pub token_index: AtomicUsize,
    pub forced_refreshes: AtomicUsize,
    pub fail_auth: bool,
}

impl MockProvider {
    pub fn with_tokens(tokens: &[&str]) -> Self {
        Self {
            tokens: Mutex::new(tokens.iter().map(|t| t.to_string()).collect()),
            ..Default::default()
        }
    }

    pub fn refresh_count(&self) -> usize {
        self.forced_refreshes.load(Ordering::SeqCst)
    }
}

impl IdentityProvider for MockProvider {
    async fn sign_in(&self, email: &str, _password: &str) -> Result<Identity, String> {
        if self.fail_auth {
            return Err("Invalid email or password.".into());
        }
        Ok(Identity::new("uid-1", Some(email.to_string()), None))
    }

    async fn sign_up(&self, email: &str, _password: &str, name: &str) -> Result<Identity, String> {
        if self.fail_auth {
            return Err("Email already in use.".into());
        }
        Ok(Identity::new("uid-1", Some(email.to_string()), Some(name.to_string())))
    }

    async fn sign_in_with_google(&self) -> Result<Identity, String> {
        if self.fail_auth {
            return Err("Popup closed.".into());
        }
        Ok(Identity::new("uid-g", Some("google@example.com".into()), Some("G User".into())))
    }

    async fn sign_out(&self) -> Result<(), String> {
        Ok(())
    }

    async fn id_token(&self, force_refresh: bool) -> Result<Option<String>, String> {
        if force_refresh {
            self.forced_refreshes.fetch_add(1, Ordering::SeqCst);
            self.token_index.fetch_add(1, Ordering::SeqCst);
        }
        let tokens = self.tokens.lock().unwrap();
        if tokens.is_empty() {
            return Ok(None);
        }
        let idx = self.token_index.load(Ordering::SeqCst).min(tokens.len() - 1);
        Ok(Some(tokens[idx].clone()))
    }
}
