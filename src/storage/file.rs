//! JSON snapshot-backed alert repository
//!
//! All records live in memory and the whole collection is rewritten to a
//! single JSON document on every mutation (temp file + rename). Mutations
//! are serialised so the file never reflects an older state than memory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::record::AlertRecord;
use crate::alerts::{AlertRepository, RepositoryError};
use crate::domain::{Alert, AlertId};

const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    schema_version: u32,
    alerts: Vec<AlertRecord>,
}

pub struct JsonFileAlertRepository {
    path: PathBuf,
    records: RwLock<HashMap<String, AlertRecord>>,
    write_lock: Mutex<()>,
}

impl JsonFileAlertRepository {
    /// Open the repository at `path`, loading existing alerts if the file exists
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let records = match tokio::fs::read(&path).await {
            Ok(data) => Self::load(&data)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(path = %path.display(), alerts = records.len(), "Alert store opened");

        Ok(Self {
            path,
            records: RwLock::new(records),
            write_lock: Mutex::new(()),
        })
    }

    fn load(data: &[u8]) -> Result<HashMap<String, AlertRecord>, RepositoryError> {
        let snapshot: Snapshot = serde_json::from_slice(data)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        if snapshot.schema_version != SCHEMA_VERSION {
            return Err(RepositoryError::Serialization(format!(
                "unsupported schema version {}",
                snapshot.schema_version
            )));
        }

        // Reject a damaged store up front rather than on first read
        for record in &snapshot.alerts {
            Alert::try_from(record.clone())?;
        }

        Ok(snapshot
            .alerts
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect())
    }

    /// Apply `change` to a copy of the records, write it out, then publish it
    async fn mutate<F>(&self, change: F) -> Result<(), RepositoryError>
    where
        F: FnOnce(&mut HashMap<String, AlertRecord>),
    {
        let _guard = self.write_lock.lock().await;

        let mut next = self.records.read().clone();
        change(&mut next);
        self.write_snapshot(&next).await?;
        *self.records.write() = next;

        Ok(())
    }

    async fn write_snapshot(
        &self,
        records: &HashMap<String, AlertRecord>,
    ) -> Result<(), RepositoryError> {
        let snapshot = Snapshot {
            schema_version: SCHEMA_VERSION,
            alerts: records.values().cloned().collect(),
        };
        let data = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &data).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!(path = %self.path.display(), bytes = data.len(), "Alert snapshot written");
        Ok(())
    }
}

#[async_trait]
impl AlertRepository for JsonFileAlertRepository {
    async fn save(&self, alert: &Alert) -> Result<(), RepositoryError> {
        let record = AlertRecord::from(alert);
        self.mutate(move |records| {
            records.insert(record.id.clone(), record);
        })
        .await
    }

    async fn find_by_id(&self, id: &AlertId) -> Result<Option<Alert>, RepositoryError> {
        let record = self.records.read().get(id.as_str()).cloned();
        record.map(Alert::try_from).transpose()
    }

    async fn find_all(&self) -> Result<Vec<Alert>, RepositoryError> {
        let records: Vec<AlertRecord> = self.records.read().values().cloned().collect();
        let mut alerts = records
            .into_iter()
            .map(Alert::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        alerts.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(alerts)
    }

    async fn count_unread(&self) -> Result<u64, RepositoryError> {
        let records = self.records.read();
        Ok(records.values().filter(|r| !r.is_read()).count() as u64)
    }

    async fn delete_one(&self, id: &AlertId) -> Result<(), RepositoryError> {
        let key = id.as_str().to_string();
        self.mutate(move |records| {
            records.remove(&key);
        })
        .await
    }

    async fn delete_all(&self) -> Result<(), RepositoryError> {
        self.mutate(|records| records.clear()).await
    }
}
