//! Token verification at the connection boundary.
//!
//! Tokens are opaque strings carried as a query parameter on the WebSocket
//! upgrade. A missing token yields a guest identity; an invalid token
//! rejects the connection. Everything past the upgrade handshake only sees
//! an `Identity`.

use std::sync::{Arc, Mutex};

use thiserror::Error;

use super::db::BoardDb;

/// Who a connection is acting as. Guests have no user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Option<String>,
}

impl Identity {
    pub fn guest() -> Self {
        Self { user_id: None }
    }

    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    pub fn is_guest(&self) -> bool {
        self.user_id.is_none()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Token lookup failed: {0}")]
    Lookup(#[source] anyhow::Error),
}

/// Maps an opaque token to an identity. The relay never interprets token
/// contents itself.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Verifier backed by the sessions table in the board database.
pub struct DbTokenVerifier {
    db: Arc<Mutex<BoardDb>>,
}

impl DbTokenVerifier {
    pub fn new(db: Arc<Mutex<BoardDb>>) -> Self {
        Self { db }
    }
}

impl TokenVerifier for DbTokenVerifier {
    fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let db = self.db.lock().expect("db mutex poisoned");
        match db.lookup_session(token).map_err(AuthError::Lookup)? {
            Some(user_id) => Ok(Identity::user(user_id)),
            None => Err(AuthError::InvalidToken),
        }
    }
}
