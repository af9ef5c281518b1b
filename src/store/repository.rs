use super::domain::{Incident, IncidentId, NewIncident, User, UserId};

/// Storage abstraction for accounts so the auth gate can be exercised in
/// isolation.
pub trait UserStore: Send + Sync {
    /// Persist a new user. Usernames are unique across the store.
    fn create_user(&self, username: &str, password_hash: &str) -> Result<UserId, StoreError>;
    fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
}

/// Storage abstraction for incident reports.
pub trait IncidentStore: Send + Sync {
    fn create_incident(&self, incident: NewIncident) -> Result<IncidentId, StoreError>;
    /// All incidents in insertion order.
    fn list_incidents(&self) -> Result<Vec<Incident>, StoreError>;
}

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("username is already taken")]
    DuplicateUsername,
    #[error("stored timestamp could not be parsed: {0}")]
    CorruptTimestamp(#[from] chrono::ParseError),
    #[error("database failure: {0}")]
    Database(#[from] rusqlite::Error),
}
