use std::collections::HashMap;
use std::sync::Mutex;

use masque_core::id::PublicUserId;

use crate::Feed;

/// Built feeds, tagged with the data version they were built at
///
/// An entry is served only for the exact data version it was tagged with, so
/// any committed write makes all entries stale.
#[derive(Debug, Default)]
pub struct FeedCache {
    entries: Mutex<HashMap<PublicUserId, (u64, Feed)>>,
}

impl FeedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: PublicUserId, data_version: u64) -> Option<Feed> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries
            .get(&user_id)
            .filter(|(version, _)| *version == data_version)
            .map(|(_, feed)| feed.clone())
    }

    /// Store `feed`, built from data at `data_version`
    ///
    /// Drops all entries tagged with any other version.
    pub fn insert(&self, user_id: PublicUserId, data_version: u64, feed: Feed) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.retain(|_, (version, _)| *version == data_version);
        entries.insert(user_id, (data_version, feed));
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}
