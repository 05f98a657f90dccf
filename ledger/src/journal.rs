//! Notification batches that commit together with an operation.

use bondcurve_common::{Notification, OperationId};

/// Notifications produced by one operation.
///
/// A batch is filled while the operation runs and handed to the host only
/// after every effect has been applied. Dropping the batch on an error path
/// discards the notifications of the rejected call.
#[derive(Debug, Clone)]
pub struct JournalBatch {
    /// Operation the batch belongs to.
    pub operation_id: OperationId,
    /// Notifications in emission order.
    pub entries: Vec<Notification>,
}

impl JournalBatch {
    /// Create a new batch.
    pub fn new(operation_id: OperationId) -> Self {
        Self {
            operation_id,
            entries: Vec::new(),
        }
    }

    /// Append a notification.
    pub fn push(&mut self, notification: Notification) {
        self.entries.push(notification);
    }

    /// Number of notifications in the batch.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
