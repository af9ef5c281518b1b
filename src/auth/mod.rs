//! Credential verification and session tracking for the protected routes.

pub mod password;
pub mod service;
pub mod session;

pub use service::{AuthError, AuthGate};
pub use session::{IssuedSession, Session, SessionManager};
