//! Per-recipient inbox statistics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::model::Notification;

/// Aggregate counts over a recipient's non-expired notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationStats {
    /// All non-expired notifications.
    pub total: u64,
    /// Not yet read.
    pub unread: u64,
    /// Read.
    pub read: u64,
    /// Dismissed, read or not.
    pub dismissed: u64,
    /// Counts keyed by kind.
    pub by_kind: BTreeMap<String, u64>,
    /// Counts keyed by display mode.
    pub by_display_mode: BTreeMap<String, u64>,
}

impl NotificationStats {
    /// Fold a sequence of rows into statistics.
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a Notification>) -> Self {
        let mut stats = Self::default();
        for n in rows {
            stats.record(n);
        }
        stats
    }

    fn record(&mut self, n: &Notification) {
        self.total += 1;
        if n.read {
            self.read += 1;
        } else {
            self.unread += 1;
        }
        if n.dismissed {
            self.dismissed += 1;
        }
        *self.by_kind.entry(n.kind.as_str().to_string()).or_default() += 1;
        *self
            .by_display_mode
            .entry(n.display_mode.as_str().to_string())
            .or_default() += 1;
    }
}
