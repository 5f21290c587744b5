//! Bounded, deduplicated, newest-first notification feed.
//!
//! The feed merges REST-fetched history (`seed`) with live pushed events
//! (`ingest_push`).  Order is arrival order: a pushed record is prepended
//! even when its timestamp is older than the head, because fetch latency
//! makes strict timestamp order unobservable anyway.

use tracing::debug;

use pavilion_shared::constants::FEED_CAP;

use crate::models::NotificationRecord;

/// The notification feed. Holds at most [`FEED_CAP`] records, no two of
/// which share an id.
#[derive(Debug, Clone, Default)]
pub struct NotificationFeed {
    records: Vec<NotificationRecord>,
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the feed wholesale with a freshly fetched batch.
    pub fn seed(&mut self, mut records: Vec<NotificationRecord>) {
        records.truncate(FEED_CAP);
        self.records = records;
    }

    /// Fold one pushed record into the feed.
    ///
    /// A record whose id is already present replaces the existing entry in
    /// place (position preserved — this is the update path for a
    /// re-delivered notification).  Otherwise the record is prepended and
    /// the feed truncated back to the cap.
    pub fn ingest_push(&mut self, record: NotificationRecord) {
        if let Some(existing) = self.records.iter_mut().find(|r| r.id == record.id) {
            debug!(id = %record.id, "Updating notification in place");
            *existing = record;
            return;
        }
        self.records.insert(0, record);
        self.records.truncate(FEED_CAP);
    }

    /// Flip a notification to read. Returns `false` when the id is absent.
    pub fn mark_read(&mut self, id: &str) -> bool {
        match self.records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.read = true;
                true
            }
            None => false,
        }
    }

    /// Number of unread notifications (derived, never stored).
    pub fn unread_count(&self) -> usize {
        self.records.iter().filter(|r| !r.read).count()
    }

    pub fn records(&self) -> &[NotificationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
