//! Notifications emitted by completed operations.
//!
//! Notifications are append-only facts handed to the host runtime once an
//! operation commits. The exchange never reads them back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::monetary::amount_string;
use crate::{Address, Amount, OperationId};

/// A structured notification of a completed state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "PascalCase")]
pub enum Notification {
    /// Units moved between accounts. Mints come from the null address, burns
    /// go to it.
    Transfer {
        from: Address,
        to: Address,
        #[serde(with = "amount_string")]
        amount: Amount,
    },
    /// An owner set a spender's allowance.
    Approval {
        owner: Address,
        spender: Address,
        #[serde(with = "amount_string")]
        amount: Amount,
    },
    /// Reserve currency was converted into units.
    Bought {
        buyer: Address,
        #[serde(with = "amount_string")]
        reserve_spent: Amount,
        #[serde(with = "amount_string")]
        units_received: Amount,
        #[serde(with = "amount_string")]
        price: Amount,
    },
    /// A holder's entire balance was converted back into reserve currency.
    Sold {
        seller: Address,
        #[serde(with = "amount_string")]
        units_sold: Amount,
        #[serde(with = "amount_string")]
        reserve_received: Amount,
        #[serde(with = "amount_string")]
        price: Amount,
    },
}

impl Notification {
    /// Get the event name.
    pub fn name(&self) -> &'static str {
        match self {
            Notification::Transfer { .. } => "Transfer",
            Notification::Approval { .. } => "Approval",
            Notification::Bought { .. } => "Bought",
            Notification::Sold { .. } => "Sold",
        }
    }

    /// Check if this transfer notification records a mint.
    pub fn is_mint(&self) -> bool {
        matches!(self, Notification::Transfer { from, .. } if from.is_null())
    }

    /// Check if this transfer notification records a burn.
    pub fn is_burn(&self) -> bool {
        matches!(self, Notification::Transfer { to, .. } if to.is_null())
    }
}

/// A notification as delivered to an event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Position in the log, starting at zero.
    pub sequence: u64,
    /// Operation that produced the notification.
    pub operation_id: OperationId,
    /// When the host recorded it.
    pub recorded_at: DateTime<Utc>,
    /// The notification itself.
    #[serde(flatten)]
    pub notification: Notification,
}

impl NotificationRecord {
    /// Create a record stamped with the current time.
    pub fn new(sequence: u64, operation_id: OperationId, notification: Notification) -> Self {
        Self {
            sequence,
            operation_id,
            recorded_at: Utc::now(),
            notification,
        }
    }

    /// Render as a single JSON line.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
