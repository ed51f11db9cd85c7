//! Directed follow graph over public users

use std::collections::{BTreeMap, BTreeSet};

use masque_core::Timestamp;
use masque_core::id::{FollowId, PublicUserId};
use redb_bincode::ReadableTable as _;
use snafu::Snafu;
use tracing::debug;

use crate::{
    Database, DbError, DbResult, FollowRecord, LOG_TARGET, WriteTransactionCtx,
    follows_followees, follows_followers, tables::users,
};

/// A follow edge: `follower` sees `followee`'s public posts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowEdge {
    pub id: FollowId,
    pub follower: PublicUserId,
    pub followee: PublicUserId,
    pub date_created: Timestamp,
}

#[derive(Debug, Snafu)]
pub enum FollowError {
    #[snafu(display("Can't follow yourself"))]
    SelfFollow,
    #[snafu(display("Already following"))]
    AlreadyFollowing,
    #[snafu(display("User not found"))]
    UserNotFound,
    #[snafu(transparent)]
    Db { source: DbError },
}
pub type FollowResult<T> = std::result::Result<T, FollowError>;

#[derive(Debug, Snafu)]
pub enum UnfollowError {
    #[snafu(display("Not following"))]
    NotFollowing,
    #[snafu(transparent)]
    Db { source: DbError },
}
pub type UnfollowResult<T> = std::result::Result<T, UnfollowError>;

pub(crate) enum InsertFollowOutcome {
    Inserted(FollowEdge),
    SelfFollow,
    AlreadyFollowing,
    UserNotFound,
}

impl Database {
    pub async fn follow(
        &self,
        follower: PublicUserId,
        followee: PublicUserId,
        ts: Timestamp,
    ) -> FollowResult<FollowEdge> {
        let outcome = self
            .write_with(|tx| {
                let outcome = Self::insert_follow_tx(follower, followee, ts, tx)?;
                if matches!(outcome, InsertFollowOutcome::Inserted(_)) {
                    self.notify_data_changed_tx(tx);
                }
                Ok(outcome)
            })
            .await?;

        match outcome {
            InsertFollowOutcome::Inserted(edge) => Ok(edge),
            InsertFollowOutcome::SelfFollow => SelfFollowSnafu.fail(),
            InsertFollowOutcome::AlreadyFollowing => AlreadyFollowingSnafu.fail(),
            InsertFollowOutcome::UserNotFound => UserNotFoundSnafu.fail(),
        }
    }

    pub(crate) fn insert_follow_tx(
        follower: PublicUserId,
        followee: PublicUserId,
        ts: Timestamp,
        tx: &WriteTransactionCtx,
    ) -> DbResult<InsertFollowOutcome> {
        if follower == followee {
            return Ok(InsertFollowOutcome::SelfFollow);
        }

        let users_tbl = tx.open_table(&users::TABLE)?;
        let mut followees_tbl = tx.open_table(&follows_followees::TABLE)?;
        let mut followers_tbl = tx.open_table(&follows_followers::TABLE)?;

        if users_tbl.get(&follower)?.is_none() || users_tbl.get(&followee)?.is_none() {
            return Ok(InsertFollowOutcome::UserNotFound);
        }

        let db_key = (follower, followee);
        if followees_tbl.get(&db_key)?.is_some() {
            return Ok(InsertFollowOutcome::AlreadyFollowing);
        }

        let record = FollowRecord {
            id: FollowId::generate(),
            ts,
        };
        followees_tbl.insert(&db_key, &record)?;
        followers_tbl.insert(&(followee, follower), &record)?;

        debug!(target: LOG_TARGET, %follower, %followee, "Follow");

        Ok(InsertFollowOutcome::Inserted(FollowEdge {
            id: record.id,
            follower,
            followee,
            date_created: ts,
        }))
    }

    pub async fn unfollow(
        &self,
        follower: PublicUserId,
        followee: PublicUserId,
    ) -> UnfollowResult<()> {
        let removed = self
            .write_with(|tx| {
                let removed = Self::remove_follow_tx(follower, followee, tx)?;
                if removed {
                    self.notify_data_changed_tx(tx);
                }
                Ok(removed)
            })
            .await?;

        if !removed {
            return NotFollowingSnafu.fail();
        }
        Ok(())
    }

    /// Returns `false` if there was no such edge
    pub(crate) fn remove_follow_tx(
        follower: PublicUserId,
        followee: PublicUserId,
        tx: &WriteTransactionCtx,
    ) -> DbResult<bool> {
        let mut followees_tbl = tx.open_table(&follows_followees::TABLE)?;
        let mut followers_tbl = tx.open_table(&follows_followers::TABLE)?;

        if followees_tbl.remove(&(follower, followee))?.is_none() {
            return Ok(false);
        }
        followers_tbl.remove(&(followee, follower))?;

        debug!(target: LOG_TARGET, %follower, %followee, "Unfollow");
        Ok(true)
    }

    pub fn read_followees_tx(
        id: PublicUserId,
        followees_tbl: &impl follows_followees::ReadableTable,
    ) -> DbResult<BTreeMap<PublicUserId, FollowRecord>> {
        Ok(followees_tbl
            .range(&(id, PublicUserId::ZERO)..=&(id, PublicUserId::MAX))?
            .map(|res| res.map(|(k, v)| (k.value().1, v.value())))
            .collect::<Result<BTreeMap<_, _>, _>>()?)
    }

    pub fn read_followers_tx(
        id: PublicUserId,
        followers_tbl: &impl follows_followers::ReadableTable,
    ) -> DbResult<BTreeMap<PublicUserId, FollowRecord>> {
        Ok(followers_tbl
            .range(&(id, PublicUserId::ZERO)..=&(id, PublicUserId::MAX))?
            .map(|res| res.map(|(k, v)| (k.value().1, v.value())))
            .collect::<Result<BTreeMap<_, _>, _>>()?)
    }

    pub async fn followees_of(&self, id: PublicUserId) -> DbResult<BTreeSet<PublicUserId>> {
        self.read_with(|tx| {
            let followees_tbl = tx.open_table(&follows_followees::TABLE)?;
            Ok(Self::read_followees_tx(id, &followees_tbl)?
                .into_keys()
                .collect())
        })
        .await
    }

    pub async fn followers_of(&self, id: PublicUserId) -> DbResult<BTreeSet<PublicUserId>> {
        self.read_with(|tx| {
            let followers_tbl = tx.open_table(&follows_followers::TABLE)?;
            Ok(Self::read_followers_tx(id, &followers_tbl)?
                .into_keys()
                .collect())
        })
        .await
    }

    /// Edges where `id` is the follower, oldest first
    pub async fn followee_edges(&self, id: PublicUserId) -> DbResult<Vec<FollowEdge>> {
        self.read_with(|tx| {
            let followees_tbl = tx.open_table(&follows_followees::TABLE)?;
            Ok(sorted_edges(
                Self::read_followees_tx(id, &followees_tbl)?
                    .into_iter()
                    .map(|(followee, record)| FollowEdge {
                        id: record.id,
                        follower: id,
                        followee,
                        date_created: record.ts,
                    }),
            ))
        })
        .await
    }

    /// Edges where `id` is the followee, oldest first
    pub async fn follower_edges(&self, id: PublicUserId) -> DbResult<Vec<FollowEdge>> {
        self.read_with(|tx| {
            let followers_tbl = tx.open_table(&follows_followers::TABLE)?;
            Ok(sorted_edges(
                Self::read_followers_tx(id, &followers_tbl)?
                    .into_iter()
                    .map(|(follower, record)| FollowEdge {
                        id: record.id,
                        follower,
                        followee: id,
                        date_created: record.ts,
                    }),
            ))
        })
        .await
    }
}

fn sorted_edges(edges: impl Iterator<Item = FollowEdge>) -> Vec<FollowEdge> {
    let mut edges: Vec<_> = edges.collect();
    edges.sort_unstable_by_key(|edge| (edge.date_created, edge.id));
    edges
}
