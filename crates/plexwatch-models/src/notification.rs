use serde::{Deserialize, Serialize};
use crate::tracked::TrackedEntry;

/// What the notification channel receives once per cycle
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub newly_available: Vec<TrackedEntry>,
    pub pending_snapshot: Vec<TrackedEntry>,
}

impl NotificationPayload {
    pub fn has_news(&self) -> bool {
        !self.newly_available.is_empty()
    }
}
