//! Identity provider port.
//!
//! The cart store only needs to know whether the caller is authenticated and,
//! if so, which bearer credential to present to the cart API.

use std::sync::RwLock;

use secrecy::SecretString;

/// Supplies the authentication signal and bearer credential.
pub trait IdentityProvider: Send + Sync {
    /// Whether the caller is authenticated.
    fn is_authenticated(&self) -> bool {
        self.bearer_token().is_some()
    }

    /// Bearer credential for the cart API, if authenticated.
    fn bearer_token(&self) -> Option<SecretString>;
}

/// Identity held in memory for the lifetime of a session.
///
/// `login` and `logout` swap the credential; the cart store picks the change
/// up on its next [`refresh_session`](crate::CartStore::refresh_session).
#[derive(Debug, Default)]
pub struct SessionIdentity {
    token: RwLock<Option<SecretString>>,
}

impl SessionIdentity {
    /// An unauthenticated session.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A session that is already authenticated with `token`.
    #[must_use]
    pub fn authenticated(token: SecretString) -> Self {
        Self {
            token: RwLock::new(Some(token)),
        }
    }

    /// Authenticate with `token`.
    pub fn login(&self, token: SecretString) {
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token);
        }
    }

    /// Drop the credential.
    pub fn logout(&self) {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
    }
}

impl IdentityProvider for SessionIdentity {
    fn bearer_token(&self) -> Option<SecretString> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_login_logout() {
        let identity = SessionIdentity::anonymous();
        assert!(!identity.is_authenticated());

        identity.login(SecretString::from("tok_9fK2mQ"));
        assert!(identity.is_authenticated());
        assert_eq!(
            identity
                .bearer_token()
                .as_ref()
                .map(ExposeSecret::expose_secret),
            Some("tok_9fK2mQ")
        );

        identity.logout();
        assert!(identity.bearer_token().is_none());
    }
}
