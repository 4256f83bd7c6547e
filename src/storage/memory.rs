use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::alerts::{AlertRepository, RepositoryError};
use crate::domain::{Alert, AlertId};

/// Process-local alert repository. Contents are lost on restart.
#[derive(Default)]
pub struct InMemoryAlertRepository {
    alerts: RwLock<HashMap<AlertId, Alert>>,
}

impl InMemoryAlertRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlertRepository for InMemoryAlertRepository {
    async fn save(&self, alert: &Alert) -> Result<(), RepositoryError> {
        self.alerts.write().insert(alert.id().clone(), alert.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &AlertId) -> Result<Option<Alert>, RepositoryError> {
        Ok(self.alerts.read().get(id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Alert>, RepositoryError> {
        let mut alerts: Vec<Alert> = self.alerts.read().values().cloned().collect();
        alerts.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(alerts)
    }

    async fn count_unread(&self) -> Result<u64, RepositoryError> {
        let alerts = self.alerts.read();
        Ok(alerts.values().filter(|a| !a.is_read()).count() as u64)
    }

    async fn delete_one(&self, id: &AlertId) -> Result<(), RepositoryError> {
        self.alerts.write().remove(id);
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), RepositoryError> {
        self.alerts.write().clear();
        Ok(())
    }
}
