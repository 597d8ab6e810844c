use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

use super::market::{PredictedPrice, RealtimePrice};

/// Backend table carrying real-time prices.
pub const REALTIME_PRICES_TABLE: &str = "realtime_stock_prices";
/// Backend table carrying predicted prices.
pub const PREDICTED_PRICES_TABLE: &str = "predicted_stock_prices";

/// An incremental row change delivered by the push channel.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    Price(RealtimePrice),
    Prediction(PredictedPrice),
}

impl PushEvent {
    pub fn symbol(&self) -> &str {
        match self {
            PushEvent::Price(p) => &p.symbol,
            PushEvent::Prediction(p) => &p.symbol,
        }
    }
}

/// Kind of row change reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Wire form of a change notification: `{"table": .., "type": .., "record": {..}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEnvelope {
    pub table: String,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(default)]
    pub record: serde_json::Value,
}

impl ChangeEnvelope {
    /// Convert into a push event.
    ///
    /// Deletes and changes on unrelated tables yield `Ok(None)`; a malformed
    /// record on a known table is an error.
    pub fn into_push_event(self) -> Result<Option<PushEvent>, CoreError> {
        if self.kind == ChangeKind::Delete {
            return Ok(None);
        }
        match self.table.as_str() {
            REALTIME_PRICES_TABLE => {
                let row: RealtimePrice = serde_json::from_value(self.record)?;
                Ok(Some(PushEvent::Price(row)))
            }
            PREDICTED_PRICES_TABLE => {
                let row: PredictedPrice = serde_json::from_value(self.record)?;
                Ok(Some(PushEvent::Prediction(row)))
            }
            _ => Ok(None),
        }
    }
}

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationLevel {
    Info,
    Error,
}

/// A transient message for the presentation layer (toast).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: title.into(),
            message: message.into(),
        }
    }
}
