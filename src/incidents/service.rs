use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use crate::notify::Notifier;
use crate::store::{Incident, IncidentId, IncidentStore, NewIncident, StoreError};

const NOTIFICATION_SUBJECT: &str = "New Incident Reported";

/// Raw form fields for a new report, prior to validation.
#[derive(Debug, Clone, Default)]
pub struct IncidentSubmission {
    pub title: String,
    pub description: String,
    pub location: String,
    pub severity: String,
}

/// Service composing the incident store and the notification transport.
pub struct IncidentService<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    recipient: String,
}

impl<S, N> IncidentService<S, N>
where
    S: IncidentStore + 'static,
    N: Notifier + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, recipient: String) -> Self {
        Self {
            store,
            notifier,
            recipient,
        }
    }

    /// Validate, persist, then notify. Persistence is the primary effect: a
    /// notification failure is logged and never surfaced to the reporter.
    pub async fn report(
        &self,
        submission: IncidentSubmission,
    ) -> Result<IncidentId, IncidentServiceError> {
        let incident = validated(submission)?;
        let title = incident.title.clone();
        let id = self.store.create_incident(incident)?;

        let body = format!("Incident {title} reported.");
        if let Err(err) = self
            .notifier
            .send(&self.recipient, NOTIFICATION_SUBJECT, &body)
            .await
        {
            warn!(%err, incident_id = id.0, "incident notification failed");
        }

        Ok(id)
    }

    /// All incidents, oldest first.
    pub fn list(&self) -> Result<Vec<Incident>, StoreError> {
        self.store.list_incidents()
    }
}

/// Every stored incident carries non-empty fields and a creation timestamp.
fn validated(submission: IncidentSubmission) -> Result<NewIncident, IncidentServiceError> {
    let field = |value: String, name: &'static str| {
        let trimmed = value.trim().to_string();
        if trimmed.is_empty() {
            Err(IncidentServiceError::Validation { field: name })
        } else {
            Ok(trimmed)
        }
    };

    Ok(NewIncident {
        title: field(submission.title, "title")?,
        description: field(submission.description, "description")?,
        location: field(submission.location, "location")?,
        severity: field(submission.severity, "severity")?,
        timestamp: Utc::now(),
    })
}

/// Error raised by the incident service.
#[derive(Debug, thiserror::Error)]
pub enum IncidentServiceError {
    #[error("{field} is required")]
    Validation { field: &'static str },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::DeliveryError;
    use crate::store::SqliteStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(
            &self,
            recipient: &str,
            subject: &str,
            body: &str,
        ) -> Result<(), DeliveryError> {
            self.sent.lock().expect("notifier mutex poisoned").push((
                recipient.to_string(),
                subject.to_string(),
                body.to_string(),
            ));
            Ok(())
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn send(&self, _: &str, _: &str, _: &str) -> Result<(), DeliveryError> {
            Err(DeliveryError::Address(
                "not-an-address".parse::<lettre::Address>().unwrap_err(),
            ))
        }
    }

    fn submission() -> IncidentSubmission {
        IncidentSubmission {
            title: "Fire".to_string(),
            description: "Kitchen fire".to_string(),
            location: "Bldg A".to_string(),
            severity: "High".to_string(),
        }
    }

    fn service<N: Notifier + 'static>(
        notifier: Arc<N>,
    ) -> IncidentService<SqliteStore, N> {
        let store = Arc::new(SqliteStore::open_in_memory().expect("store opens"));
        IncidentService::new(store, notifier, "admin@example.com".to_string())
    }

    #[tokio::test]
    async fn report_persists_and_notifies() {
        let notifier = Arc::new(RecordingNotifier::default());
        let service = service(notifier.clone());

        let before = Utc::now();
        service.report(submission()).await.expect("report succeeds");

        let listed = service.list().expect("list succeeds");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Fire");
        assert!(listed[0].timestamp >= before);

        let sent = notifier.sent.lock().expect("notifier mutex poisoned");
        assert_eq!(
            sent.as_slice(),
            [(
                "admin@example.com".to_string(),
                "New Incident Reported".to_string(),
                "Incident Fire reported.".to_string(),
            )]
        );
    }

    #[tokio::test]
    async fn notifier_failure_does_not_lose_the_incident() {
        let service = service(Arc::new(FailingNotifier));

        let id = service
            .report(submission())
            .await
            .expect("report succeeds despite delivery failure");

        let listed = service.list().expect("list succeeds");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
    }

    #[tokio::test]
    async fn missing_fields_are_named() {
        let service = service(Arc::new(RecordingNotifier::default()));

        let mut blank = submission();
        blank.location = "   ".to_string();
        let err = service.report(blank).await.expect_err("rejected");
        assert!(matches!(
            err,
            IncidentServiceError::Validation { field: "location" }
        ));

        assert!(service.list().expect("list succeeds").is_empty());
    }
}
