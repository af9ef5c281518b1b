//! Persistence for the two flat record types: users and incidents.

pub mod domain;
pub mod repository;
pub mod sqlite;

pub use domain::{Incident, IncidentId, NewIncident, SessionSubject, User, UserId};
pub use repository::{IncidentStore, StoreError, UserStore};
pub use sqlite::SqliteStore;
