use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::ids::CustomerId;
use crate::job::Progress;

/// How long a non-sticky update survives a `drain` before it is pruned.
const RETENTION: Duration = Duration::seconds(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Progress,
    Completed,
    Cancelled,
}

impl ProgressStatus {
    /// Completion-class updates are sticky: they survive the normal
    /// retention window so a late client poll still observes the terminal
    /// state (spec §4.6). Cancellation is deliberately *not* sticky beyond
    /// the window — the authoritative cancellation signal is the
    /// `is_cancelled` flag on the status endpoint, not the feed.
    fn is_sticky(&self) -> bool {
        matches!(self, ProgressStatus::Completed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressUpdate {
    pub customer_id: CustomerId,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub status: ProgressStatus,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_completion: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
}

impl ProgressUpdate {
    fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.timestamp
    }
}

/// Per-customer append-only log of [`ProgressUpdate`]s, consumed via
/// [`ProgressFeed::drain`].
#[derive(Debug, Default)]
pub struct ProgressFeed {
    entries: HashMap<CustomerId, Vec<ProgressUpdate>>,
}

impl ProgressFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, update: ProgressUpdate) {
        self.entries.entry(update.customer_id).or_default().push(update);
    }

    /// Returns the current buffer for `customer_id` and retains only entries
    /// that are sticky or still within the retention window (spec §4.6).
    pub fn drain(&mut self, customer_id: CustomerId) -> Vec<ProgressUpdate> {
        let now = Utc::now();
        let Some(entries) = self.entries.get_mut(&customer_id) else {
            return Vec::new();
        };

        let snapshot = entries.clone();
        entries.retain(|u| u.status.is_sticky() || u.age(now) < RETENTION);
        snapshot
    }

    pub fn remove(&mut self, customer_id: CustomerId) {
        self.entries.remove(&customer_id);
    }
}
