use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode};

use super::domain::{Incident, IncidentId, NewIncident, User, UserId};
use super::repository::{IncidentStore, StoreError, UserStore};

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS incidents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    location TEXT NOT NULL,
    severity TEXT NOT NULL
);
";

/// SQLite-backed store. One connection, shared behind a mutex; the schema is
/// created when the store is opened, not per request.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Private in-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl UserStore for SqliteStore {
    fn create_user(&self, username: &str, password_hash: &str) -> Result<UserId, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let inserted = conn.execute(
            "INSERT INTO users (username, password_hash) VALUES (?1, ?2)",
            params![username, password_hash],
        );
        match inserted {
            Ok(_) => Ok(UserId(conn.last_insert_rowid())),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateUsername)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut statement =
            conn.prepare("SELECT id, username, password_hash FROM users WHERE username = ?1")?;
        let mut rows = statement.query_map(params![username], |row| {
            Ok(User {
                id: UserId(row.get(0)?),
                username: row.get(1)?,
                password_hash: row.get(2)?,
            })
        })?;
        rows.next().transpose().map_err(StoreError::from)
    }
}

impl IncidentStore for SqliteStore {
    fn create_incident(&self, incident: NewIncident) -> Result<IncidentId, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(
            "INSERT INTO incidents (title, description, timestamp, location, severity)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                incident.title,
                incident.description,
                incident.timestamp.to_rfc3339(),
                incident.location,
                incident.severity,
            ],
        )?;
        Ok(IncidentId(conn.last_insert_rowid()))
    }

    fn list_incidents(&self) -> Result<Vec<Incident>, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut statement = conn.prepare(
            "SELECT id, title, description, timestamp, location, severity
             FROM incidents ORDER BY id",
        )?;
        let rows = statement.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut incidents = Vec::new();
        for row in rows {
            let (id, title, description, timestamp, location, severity) = row?;
            incidents.push(Incident {
                id: IncidentId(id),
                title,
                description,
                timestamp: parse_timestamp(&timestamp)?,
                location,
                severity,
            });
        }
        Ok(incidents)
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}
