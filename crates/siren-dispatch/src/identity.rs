//! Session resolution.
//!
//! The identity provider itself (credential checks, third-party sign-in) is
//! out of scope; the core only needs a stable opaque account id per
//! signed-in principal. `MemorySessions` is the in-process implementation
//! used by the server and tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use ulid::Ulid;

use siren_core::id::AccountId;

/// Maps opaque session tokens to stable account ids.
#[async_trait]
pub trait SessionProvider: Send + Sync + 'static {
    /// Returns the account id for an active session token, if any.
    async fn current_user(&self, token: &str) -> Option<AccountId>;
}

/// In-process session table.
#[derive(Debug, Default)]
pub struct MemorySessions {
    tokens: RwLock<HashMap<String, AccountId>>,
}

impl MemorySessions {
    /// Creates an empty session table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh opaque token for an account.
    #[must_use]
    pub fn sign_in(&self, account: AccountId) -> String {
        let token = Ulid::new().to_string();
        if let Ok(mut tokens) = self.tokens.write() {
            tokens.insert(token.clone(), account);
        }
        token
    }

    /// Revokes a token. Unknown tokens are ignored.
    pub fn sign_out(&self, token: &str) {
        if let Ok(mut tokens) = self.tokens.write() {
            tokens.remove(token);
        }
    }
}

#[async_trait]
impl SessionProvider for MemorySessions {
    async fn current_user(&self, token: &str) -> Option<AccountId> {
        self.tokens.read().ok()?.get(token).copied()
    }
}

/// Resolves an optional session to a stable account identifier.
///
/// No session is a valid outcome (the caller falls back to guest identity),
/// not an error. Resolution has no side effects.
#[derive(Clone)]
pub struct IdentityResolver {
    sessions: Arc<dyn SessionProvider>,
}

impl IdentityResolver {
    /// Creates a resolver over the given session provider.
    #[must_use]
    pub fn new(sessions: Arc<dyn SessionProvider>) -> Self {
        Self { sessions }
    }

    /// Returns the caller's account id, or `None` when unauthenticated.
    pub async fn resolve(&self, token: Option<&str>) -> Option<AccountId> {
        match token {
            Some(token) => self.sessions.current_user(token).await,
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_active_sessions() {
        let sessions = Arc::new(MemorySessions::new());
        let account = AccountId::generate();
        let token = sessions.sign_in(account);

        let resolver = IdentityResolver::new(sessions);
        assert_eq!(resolver.resolve(Some(&token)).await, Some(account));
    }

    #[tokio::test]
    async fn missing_session_is_none_not_error() {
        let resolver = IdentityResolver::new(Arc::new(MemorySessions::new()));
        assert_eq!(resolver.resolve(None).await, None);
        assert_eq!(resolver.resolve(Some("stale-token")).await, None);
    }

    #[tokio::test]
    async fn sign_out_revokes_the_token() {
        let sessions = Arc::new(MemorySessions::new());
        let token = sessions.sign_in(AccountId::generate());
        sessions.sign_out(&token);

        let resolver = IdentityResolver::new(sessions);
        assert_eq!(resolver.resolve(Some(&token)).await, None);
    }
}
