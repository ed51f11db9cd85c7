use std::cmp;

use crate::Timestamp;

/// Sort key shared by every post listing
///
/// Ascending order of the key is: most recently modified first, and for
/// equal modification times, the earlier inserted post first. `seq` is the
/// insertion sequence number of the post within its pool, so no two posts of
/// one pool ever compare equal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeedOrderKey {
    modified: cmp::Reverse<Timestamp>,
    seq: u64,
}

impl FeedOrderKey {
    pub fn new(date_modified: Timestamp, seq: u64) -> Self {
        Self {
            modified: cmp::Reverse(date_modified),
            seq,
        }
    }
}
