//! Alert orchestration: create, persist, deliver, persist again

use std::sync::Arc;
use std::time::Duration;

use super::command::CreateAlertCommand;
use super::ports::{AlertRepository, AlertSender, RepositoryError, SendError};
use crate::domain::{Alert, AlertId, DomainError};

/// Reason recorded when a sender error carries no message
pub const UNKNOWN_DELIVERY_ERROR: &str = "Unknown error";

/// Default bound on a single delivery attempt
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Coordinates alert creation, delivery, and repository operations
pub struct AlertService {
    repository: Arc<dyn AlertRepository>,
    sender: Arc<dyn AlertSender>,
    delivery_timeout: Duration,
}

impl AlertService {
    pub fn new(repository: Arc<dyn AlertRepository>, sender: Arc<dyn AlertSender>) -> Self {
        Self {
            repository,
            sender,
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
        }
    }

    /// Set the bound on a single delivery attempt
    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    /// Create an alert, attempt delivery once, and persist the outcome.
    ///
    /// The alert is saved before and after the delivery attempt. A failed or
    /// timed out delivery is recorded on the alert as `FAILED` and the new id
    /// is still returned; only repository errors reach the caller.
    pub async fn create_and_send(
        &self,
        command: CreateAlertCommand,
    ) -> Result<AlertId, AlertServiceError> {
        let mut alert = Alert::create(command.into_details());
        self.repository.save(&alert).await?;

        match self.deliver(&alert).await {
            Ok(()) => {
                alert.mark_as_sent();
                tracing::info!(alert_id = %alert.id(), "Alert delivered");
            }
            Err(reason) => {
                tracing::warn!(alert_id = %alert.id(), reason = %reason, "Alert delivery failed");
                alert.mark_as_failed(reason);
            }
        }

        self.repository.save(&alert).await?;
        Ok(alert.id().clone())
    }

    async fn deliver(&self, alert: &Alert) -> Result<(), String> {
        match tokio::time::timeout(self.delivery_timeout, self.sender.send(alert)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(failure_reason(&e)),
            Err(_) => Err(format!(
                "Delivery timed out after {:?}",
                self.delivery_timeout
            )),
        }
    }

    /// Look up an alert by its string identifier
    pub async fn get_by_id(&self, id: &str) -> Result<Alert, AlertServiceError> {
        let alert_id = AlertId::parse(id)?;
        self.repository
            .find_by_id(&alert_id)
            .await?
            .ok_or_else(|| AlertServiceError::NotFound(id.to_string()))
    }

    pub async fn get_all(&self) -> Result<Vec<Alert>, AlertServiceError> {
        Ok(self.repository.find_all().await?)
    }

    pub async fn get_unread_count(&self) -> Result<u64, AlertServiceError> {
        Ok(self.repository.count_unread().await?)
    }

    pub async fn mark_as_read(&self, id: &str) -> Result<(), AlertServiceError> {
        let mut alert = self.get_by_id(id).await?;
        alert.mark_as_read();
        self.repository.save(&alert).await?;
        Ok(())
    }

    pub async fn delete_one(&self, id: &str) -> Result<(), AlertServiceError> {
        let alert_id = AlertId::parse(id)?;
        self.repository.delete_one(&alert_id).await?;
        tracing::info!(alert_id = %alert_id, "Alert deleted");
        Ok(())
    }

    pub async fn delete_all(&self) -> Result<(), AlertServiceError> {
        self.repository.delete_all().await?;
        tracing::info!("All alerts deleted");
        Ok(())
    }
}

fn failure_reason(error: &SendError) -> String {
    let message = error.to_string();
    if message.trim().is_empty() {
        UNKNOWN_DELIVERY_ERROR.to_string()
    } else {
        message
    }
}

/// Alert service errors
#[derive(Debug, thiserror::Error)]
pub enum AlertServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Alert with id {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AlertStatus, BreachDetails};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Keeps every saved snapshot so tests can inspect the save sequence
    #[derive(Default)]
    struct RecordingRepository {
        saved: Mutex<Vec<Alert>>,
        stored: Mutex<HashMap<AlertId, Alert>>,
        deleted: Mutex<Vec<AlertId>>,
        delete_all_calls: Mutex<usize>,
        fail_save_number: Option<usize>,
    }

    impl RecordingRepository {
        fn failing_on_save(n: usize) -> Self {
            Self {
                fail_save_number: Some(n),
                ..Default::default()
            }
        }

        fn saved(&self) -> Vec<Alert> {
            self.saved.lock().clone()
        }
    }

    #[async_trait]
    impl AlertRepository for RecordingRepository {
        async fn save(&self, alert: &Alert) -> Result<(), RepositoryError> {
            let mut saved = self.saved.lock();
            saved.push(alert.clone());
            if self.fail_save_number == Some(saved.len()) {
                return Err(RepositoryError::Serialization("disk full".to_string()));
            }
            self.stored.lock().insert(alert.id().clone(), alert.clone());
            Ok(())
        }

        async fn find_by_id(&self, id: &AlertId) -> Result<Option<Alert>, RepositoryError> {
            Ok(self.stored.lock().get(id).cloned())
        }

        async fn find_all(&self) -> Result<Vec<Alert>, RepositoryError> {
            Ok(self.stored.lock().values().cloned().collect())
        }

        async fn count_unread(&self) -> Result<u64, RepositoryError> {
            Ok(self.stored.lock().values().filter(|a| !a.is_read()).count() as u64)
        }

        async fn delete_one(&self, id: &AlertId) -> Result<(), RepositoryError> {
            self.deleted.lock().push(id.clone());
            self.stored.lock().remove(id);
            Ok(())
        }

        async fn delete_all(&self) -> Result<(), RepositoryError> {
            *self.delete_all_calls.lock() += 1;
            self.stored.lock().clear();
            Ok(())
        }
    }

    enum StubSender {
        Succeeds,
        Fails(String),
        Hangs,
    }

    #[async_trait]
    impl AlertSender for StubSender {
        async fn send(&self, _alert: &Alert) -> Result<(), SendError> {
            match self {
                StubSender::Succeeds => Ok(()),
                StubSender::Fails(msg) => Err(SendError::Delivery(msg.clone())),
                StubSender::Hangs => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(())
                }
            }
        }
    }

    fn command() -> CreateAlertCommand {
        CreateAlertCommand {
            threshold_id: "t-1".to_string(),
            threshold_name: "High electricity usage".to_string(),
            utility_type: "Electricity".to_string(),
            threshold_type: "ACTUAL".to_string(),
            period_type: None,
            limit_value: 2.2,
            detected_value: 2.5,
        }
    }

    fn service(repo: &Arc<RecordingRepository>, sender: StubSender) -> AlertService {
        AlertService::new(repo.clone(), Arc::new(sender))
    }

    #[tokio::test]
    async fn test_create_and_send_marks_sent() {
        let repo = Arc::new(RecordingRepository::default());
        let service = service(&repo, StubSender::Succeeds);

        let id = service.create_and_send(command()).await.unwrap();

        let saved = repo.saved();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].status(), AlertStatus::Pending);
        assert_eq!(saved[1].status(), AlertStatus::Sent);
        assert!(saved[1].sent_at().is_some());
        assert_eq!(saved[1].id(), &id);
    }

    #[tokio::test]
    async fn test_create_and_send_records_delivery_failure() {
        let repo = Arc::new(RecordingRepository::default());
        let service = service(&repo, StubSender::Fails("SMTP Timeout".to_string()));

        let id = service.create_and_send(command()).await.unwrap();

        let saved = repo.saved();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[1].status(), AlertStatus::Failed);
        assert_eq!(saved[1].fail_reason(), Some("SMTP Timeout"));
        assert_eq!(saved[1].id(), &id);
    }

    #[tokio::test]
    async fn test_empty_error_message_uses_fallback() {
        let repo = Arc::new(RecordingRepository::default());
        let service = service(&repo, StubSender::Fails(String::new()));

        service.create_and_send(command()).await.unwrap();

        assert_eq!(repo.saved()[1].fail_reason(), Some(UNKNOWN_DELIVERY_ERROR));
    }

    #[tokio::test]
    async fn test_hung_sender_is_bounded_by_timeout() {
        let repo = Arc::new(RecordingRepository::default());
        let service = service(&repo, StubSender::Hangs)
            .with_delivery_timeout(Duration::from_millis(20));

        service.create_and_send(command()).await.unwrap();

        let last = repo.saved().pop().unwrap();
        assert_eq!(last.status(), AlertStatus::Failed);
        assert!(last.fail_reason().unwrap().starts_with("Delivery timed out"));
    }

    #[tokio::test]
    async fn test_first_save_failure_propagates_without_delivery() {
        let repo = Arc::new(RecordingRepository::failing_on_save(1));
        let service = service(&repo, StubSender::Succeeds);

        let err = service.create_and_send(command()).await.unwrap_err();

        assert!(matches!(err, AlertServiceError::Repository(_)));
        assert_eq!(repo.saved().len(), 1);
    }

    #[tokio::test]
    async fn test_second_save_failure_propagates() {
        let repo = Arc::new(RecordingRepository::failing_on_save(2));
        let service = service(&repo, StubSender::Succeeds);

        let err = service.create_and_send(command()).await.unwrap_err();
        assert!(matches!(err, AlertServiceError::Repository(_)));
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let repo = Arc::new(RecordingRepository::default());
        let service = service(&repo, StubSender::Succeeds);
        let id = service.create_and_send(command()).await.unwrap();

        let alert = service.get_by_id(id.as_str()).await.unwrap();
        assert_eq!(alert, repo.saved()[1]);

        let err = service.get_by_id("missing-id").await.unwrap_err();
        assert!(matches!(err, AlertServiceError::NotFound(ref id) if id == "missing-id"));

        let err = service.get_by_id("   ").await.unwrap_err();
        assert!(matches!(err, AlertServiceError::Domain(_)));
    }

    #[tokio::test]
    async fn test_mark_as_read_saves_read_state() {
        let repo = Arc::new(RecordingRepository::default());
        let service = service(&repo, StubSender::Succeeds);
        let id = service.create_and_send(command()).await.unwrap();

        service.mark_as_read(id.as_str()).await.unwrap();

        let saved = repo.saved();
        assert_eq!(saved.len(), 3);
        assert!(saved[2].is_read());
        assert_eq!(service.get_unread_count().await.unwrap(), 0);

        let err = service.mark_as_read("unknown").await.unwrap_err();
        assert!(matches!(err, AlertServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_one_passes_parsed_id() {
        let repo = Arc::new(RecordingRepository::default());
        let service = service(&repo, StubSender::Succeeds);

        service.delete_one(" valid-uuid-to-delete ").await.unwrap();

        let deleted = repo.deleted.lock().clone();
        assert_eq!(deleted, vec![AlertId::parse("valid-uuid-to-delete").unwrap()]);

        assert!(matches!(
            service.delete_one("").await,
            Err(AlertServiceError::Domain(_))
        ));
        assert_eq!(repo.deleted.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_get_all_and_delete_all() {
        let repo = Arc::new(RecordingRepository::default());
        let service = service(&repo, StubSender::Succeeds);
        service.create_and_send(command()).await.unwrap();
        service.create_and_send(command()).await.unwrap();

        assert_eq!(service.get_all().await.unwrap().len(), 2);

        service.delete_all().await.unwrap();
        assert_eq!(*repo.delete_all_calls.lock(), 1);
        assert!(service.get_all().await.unwrap().is_empty());
    }

    #[test]
    fn test_command_into_details() {
        let details = command().into_details();
        assert_eq!(
            details,
            BreachDetails::new("t-1", "High electricity usage", "Electricity", "ACTUAL", None, 2.2, 2.5)
        );
    }
}
