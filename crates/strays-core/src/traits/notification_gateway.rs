// # Notification Gateway Trait
//
// Defines where change notifications end up.
//
// ## Implementations
//
// - In-memory: `store::MemoryNotificationLog`
// - File-based: `store::FileNotificationLog` (JSON lines)

use async_trait::async_trait;

use crate::notifier::{AlertNotification, NotificationRecord, UpdateNotification};

/// Trait for notification sinks
///
/// Only called by the coordinator, strictly after the entity was saved.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Record a generic update notification
    ///
    /// # Parameters
    ///
    /// - `notification`: Applied non-alert changes of one request
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Recorded
    /// - `Err(Error)`: Delivery failed
    async fn record_update(&self, notification: &UpdateNotification) -> Result<(), crate::Error>;

    /// Record a prioritized alert
    ///
    /// # Parameters
    ///
    /// - `notification`: One condition change with its priority
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Recorded
    /// - `Err(Error)`: Delivery failed
    async fn record_alert(&self, notification: &AlertNotification) -> Result<(), crate::Error>;

    /// Record every notification of one request, or none of them
    ///
    /// Used when delivery is required: a failed call must leave nothing
    /// behind that describes a change the coordinator is about to undo.
    ///
    /// # Parameters
    ///
    /// - `records`: Alerts and update of one request, in delivery order
    ///
    /// # Returns
    ///
    /// - `Ok(())`: All records stored
    /// - `Err(Error)`: No record stored
    async fn record_all(&self, records: &[NotificationRecord]) -> Result<(), crate::Error>;
}
