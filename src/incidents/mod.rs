//! Incident report intake and retrieval.

pub mod service;

pub use service::{IncidentService, IncidentServiceError, IncidentSubmission};
