// # Notification Logs
//
// NotificationGateway implementations that keep every record.
//
// - `MemoryNotificationLog`: records kept in memory, for tests and embedding
// - `FileNotificationLog`: one JSON object per line, appended

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};

use crate::notifier::{AlertNotification, NotificationRecord, UpdateNotification};
use crate::traits::NotificationGateway;
use crate::Error;

/// In-memory notification log
///
/// Clones share the same record list.
#[derive(Debug, Clone, Default)]
pub struct MemoryNotificationLog {
    records: Arc<RwLock<Vec<NotificationRecord>>>,
}

impl MemoryNotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records, in delivery order
    pub async fn records(&self) -> Vec<NotificationRecord> {
        self.records.read().await.clone()
    }

    pub async fn updates(&self) -> Vec<UpdateNotification> {
        self.records
            .read()
            .await
            .iter()
            .filter_map(|r| r.as_update().cloned())
            .collect()
    }

    pub async fn alerts(&self) -> Vec<AlertNotification> {
        self.records
            .read()
            .await
            .iter()
            .filter_map(|r| r.as_alert().cloned())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl NotificationGateway for MemoryNotificationLog {
    async fn record_update(&self, notification: &UpdateNotification) -> Result<(), Error> {
        self.records
            .write()
            .await
            .push(NotificationRecord::Update(notification.clone()));
        Ok(())
    }

    async fn record_alert(&self, notification: &AlertNotification) -> Result<(), Error> {
        self.records
            .write()
            .await
            .push(NotificationRecord::Alert(notification.clone()));
        Ok(())
    }

    async fn record_all(&self, records: &[NotificationRecord]) -> Result<(), Error> {
        self.records.write().await.extend_from_slice(records);
        Ok(())
    }
}

/// Append-only JSON-lines notification log
///
/// # Example
///
/// ```rust,no_run
/// use strays_core::store::FileNotificationLog;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let log = FileNotificationLog::new("/var/lib/strays/notifications.jsonl").await?;
///     for record in log.read_all().await? {
///         println!("{:?}", record);
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileNotificationLog {
    path: PathBuf,
    /// Serializes appends so lines never interleave
    write_lock: Mutex<()>,
}

impl FileNotificationLog {
    /// Open a log file, creating parent directories if needed
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::config(format!(
                        "Failed to create notification log directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Read every record in the log
    ///
    /// Blank lines are ignored; a malformed line is an error.
    pub async fn read_all(&self) -> Result<Vec<NotificationRecord>, Error> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path).await?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(Error::from))
            .collect()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `records` with a single write
    ///
    /// Everything is serialized before the file is touched, so an encoding
    /// error writes nothing.
    async fn append(&self, records: &[NotificationRecord]) -> Result<(), Error> {
        let mut lines = String::new();
        for record in records {
            lines.push_str(&serde_json::to_string(record)?);
            lines.push('\n');
        }

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                Error::notification(format!(
                    "Failed to open notification log {}: {}",
                    self.path.display(),
                    e
                ))
            })?;

        file.write_all(lines.as_bytes()).await.map_err(|e| {
            Error::notification(format!(
                "Failed to append to notification log {}: {}",
                self.path.display(),
                e
            ))
        })?;
        file.flush().await?;

        tracing::trace!("{} notifications appended to {}", records.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl NotificationGateway for FileNotificationLog {
    async fn record_update(&self, notification: &UpdateNotification) -> Result<(), Error> {
        self.append(&[NotificationRecord::Update(notification.clone())])
            .await
    }

    async fn record_alert(&self, notification: &AlertNotification) -> Result<(), Error> {
        self.append(&[NotificationRecord::Alert(notification.clone())])
            .await
    }

    async fn record_all(&self, records: &[NotificationRecord]) -> Result<(), Error> {
        if records.is_empty() {
            return Ok(());
        }
        self.append(records).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applier::FieldChange;
    use crate::model::{EntityId, EntityKind, EntityRef, PriorityType, RequesterId, SeverityBand};
    use crate::notifier::NotificationContentType;
    use chrono::Utc;
    use tempfile::tempdir;

    fn update() -> UpdateNotification {
        UpdateNotification {
            content_type: NotificationContentType::AnimalUpdate,
            entity: EntityRef::new(EntityKind::Animal, EntityId(1)),
            changes: vec![FieldChange::new("name", "Tama".into(), "Mike".into())],
            registered_by: RequesterId(2),
            created_at: Utc::now(),
        }
    }

    fn alert() -> AlertNotification {
        AlertNotification {
            content_type: NotificationContentType::ConditionUpdate,
            entity: EntityRef::new(EntityKind::Animal, EntityId(1)),
            change: FieldChange::new("condition", "HEALTHY".into(), "ILL".into()),
            registered_by: RequesterId(2),
            priority: PriorityType::High,
            severity: SeverityBand::Negative,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_memory_log_keeps_order() {
        let log = MemoryNotificationLog::new();
        assert!(log.is_empty().await);

        log.record_alert(&alert()).await.unwrap();
        log.record_update(&update()).await.unwrap();

        let records = log.records().await;
        assert_eq!(records.len(), 2);
        assert!(records[0].as_alert().is_some());
        assert!(records[1].as_update().is_some());
        assert_eq!(log.alerts().await.len(), 1);
        assert_eq!(log.updates().await.len(), 1);
    }

    #[tokio::test]
    async fn test_file_log_appends_json_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("notifications.jsonl");

        let log = FileNotificationLog::new(&path).await.unwrap();
        assert!(log.read_all().await.unwrap().is_empty());

        let (u, a) = (update(), alert());
        log.record_update(&u).await.unwrap();
        log.record_alert(&a).await.unwrap();

        let content = fs::read_to_string(&path).await.unwrap();
        assert_eq!(content.lines().count(), 2);

        // Reopening continues the same file
        let reopened = FileNotificationLog::new(&path).await.unwrap();
        reopened.record_update(&u).await.unwrap();
        let records = reopened.read_all().await.unwrap();
        assert_eq!(
            records,
            vec![
                NotificationRecord::Update(u.clone()),
                NotificationRecord::Alert(a),
                NotificationRecord::Update(u),
            ]
        );
    }

    #[tokio::test]
    async fn test_record_all_keeps_batch_order() {
        let dir = tempdir().unwrap();
        let log = FileNotificationLog::new(dir.path().join("notifications.jsonl"))
            .await
            .unwrap();
        let batch = vec![
            NotificationRecord::Alert(alert()),
            NotificationRecord::Update(update()),
        ];

        log.record_all(&batch).await.unwrap();
        log.record_all(&[]).await.unwrap();
        assert_eq!(log.read_all().await.unwrap(), batch);

        let memory = MemoryNotificationLog::new();
        memory.record_all(&batch).await.unwrap();
        assert_eq!(memory.records().await, batch);
    }
}
