use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for registered users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Identifier wrapper for persisted incidents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncidentId(pub i64);

/// A registered account. Reports are deliberately not attributed to users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

/// Capability required of anything that can own a session: a stable
/// identifier usable as the session subject.
pub trait SessionSubject {
    fn subject_id(&self) -> i64;
}

impl SessionSubject for User {
    fn subject_id(&self) -> i64 {
        self.id.0
    }
}

/// A submitted incident report. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub location: String,
    pub severity: String,
}

/// Fields of an incident before the store assigns its identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIncident {
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub location: String,
    pub severity: String,
}
