use std::sync::Arc;

use super::password;
use super::session::{IssuedSession, Session, SessionManager};
use crate::store::{StoreError, UserId, UserStore};

/// Credential checks and session lifecycle, composed over a user store.
pub struct AuthGate<U> {
    users: Arc<U>,
    sessions: Arc<SessionManager>,
}

impl<U> AuthGate<U>
where
    U: UserStore + 'static,
{
    pub fn new(users: Arc<U>, sessions: Arc<SessionManager>) -> Self {
        Self { users, sessions }
    }

    /// Create an account with an Argon2id-hashed password.
    pub fn register(&self, username: &str, password: &str) -> Result<UserId, AuthError> {
        let password_hash = password::hash(password)?;
        self.users
            .create_user(username, &password_hash)
            .map_err(|err| match err {
                StoreError::DuplicateUsername => AuthError::DuplicateUsername,
                other => AuthError::Store(other),
            })
    }

    /// Verify credentials and establish a session. Unknown usernames and
    /// wrong passwords are indistinguishable to the caller, and both cost
    /// one hash verification.
    pub fn login(&self, username: &str, password: &str) -> Result<IssuedSession, AuthError> {
        match self.users.find_user_by_username(username)? {
            Some(user) if password::verify(password, &user.password_hash) => {
                Ok(self.sessions.issue(&user))
            }
            Some(_) => Err(AuthError::InvalidCredentials),
            None => {
                password::verify_sink(password);
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    pub fn logout(&self, session: &Session) {
        self.sessions.revoke(&session.token);
    }
}

/// Error raised by the auth gate.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("username is already taken")]
    DuplicateUsername,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    Hash(#[from] argon2::password_hash::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}
