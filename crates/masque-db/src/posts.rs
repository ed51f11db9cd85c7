//! The two post pools
//!
//! Public posts are authored by public users, anonymous posts by personas.
//! The pools never share a table, and nothing in the anonymous pool refers to a
//! public user.

use masque_core::id::{AnonymousPostId, PersonaId, PublicPostId, PublicUserId};
use masque_core::{FeedOrderKey, PostContent, Timestamp};
use redb_bincode::ReadableTable as _;
use snafu::Snafu;
use tracing::debug;

use crate::{
    AnonymousPostRecord, Database, DbError, DbResult, LOG_TARGET, PostsSeqRecord,
    PublicPostRecord, WriteTransactionCtx, personas, posts_anonymous, posts_anonymous_by_author,
    posts_public, posts_public_by_author, posts_seq, tables::users,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicPost {
    pub id: PublicPostId,
    pub author: PublicUserId,
    pub content: PostContent,
    pub date_created: Timestamp,
    pub date_modified: Timestamp,
    pub seq: u64,
}

impl PublicPost {
    fn from_record(id: PublicPostId, record: PublicPostRecord) -> Self {
        Self {
            id,
            author: record.author,
            content: record.content,
            date_created: record.date_created,
            date_modified: record.date_modified,
            seq: record.seq,
        }
    }

    pub fn order_key(&self) -> FeedOrderKey {
        FeedOrderKey::new(self.date_modified, self.seq)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnonymousPost {
    pub id: AnonymousPostId,
    pub author: PersonaId,
    pub content: PostContent,
    pub date_created: Timestamp,
    pub date_modified: Timestamp,
    pub seq: u64,
}

impl AnonymousPost {
    fn from_record(id: AnonymousPostId, record: AnonymousPostRecord) -> Self {
        Self {
            id,
            author: record.author,
            content: record.content,
            date_created: record.date_created,
            date_modified: record.date_modified,
            seq: record.seq,
        }
    }

    pub fn order_key(&self) -> FeedOrderKey {
        FeedOrderKey::new(self.date_modified, self.seq)
    }
}

#[derive(Debug, Snafu)]
pub enum PostError {
    #[snafu(display("Author not found"))]
    AuthorNotFound,
    #[snafu(display("Post not found"))]
    PostNotFound,
    #[snafu(display("Not the author of the post"))]
    NotOwner,
    #[snafu(transparent)]
    Db { source: DbError },
}
pub type PostResult<T> = std::result::Result<T, PostError>;

pub(crate) enum WritePostOutcome<T> {
    Done(T),
    AuthorNotFound,
    PostNotFound,
    NotOwner,
}

impl<T> WritePostOutcome<T> {
    fn into_result(self) -> PostResult<T> {
        match self {
            WritePostOutcome::Done(v) => Ok(v),
            WritePostOutcome::AuthorNotFound => AuthorNotFoundSnafu.fail(),
            WritePostOutcome::PostNotFound => PostNotFoundSnafu.fail(),
            WritePostOutcome::NotOwner => NotOwnerSnafu.fail(),
        }
    }

    fn is_done(&self) -> bool {
        matches!(self, WritePostOutcome::Done(_))
    }
}

fn sorted_by_order_key<T>(mut posts: Vec<T>, key: impl Fn(&T) -> FeedOrderKey) -> Vec<T> {
    posts.sort_unstable_by_key(key);
    posts
}

impl Database {
    /// Allocate the next insertion sequence number of a pool
    fn next_seq_tx(
        posts_seq_tbl: &mut posts_seq::Table,
        pool: impl FnOnce(&mut PostsSeqRecord) -> &mut u64,
    ) -> DbResult<u64> {
        let mut record = posts_seq_tbl
            .get(&())?
            .map(|g| g.value())
            .unwrap_or_default();
        let counter = pool(&mut record);
        let seq = *counter;
        *counter += 1;
        posts_seq_tbl.insert(&(), &record)?;
        Ok(seq)
    }

    /// Write a post and notify about data change, if the outcome is `Done`
    async fn write_post_with<T>(
        &self,
        f: impl FnOnce(&'_ WriteTransactionCtx) -> DbResult<WritePostOutcome<T>>,
    ) -> PostResult<T> {
        self.write_with(|tx| {
            let outcome = f(tx)?;
            if outcome.is_done() {
                self.notify_data_changed_tx(tx);
            }
            Ok(outcome)
        })
        .await?
        .into_result()
    }
}

// PUBLIC POOL
impl Database {
    pub async fn create_public_post(
        &self,
        author: PublicUserId,
        content: PostContent,
        ts: Timestamp,
    ) -> PostResult<PublicPost> {
        let post = self
            .write_post_with(|tx| {
                let users_tbl = tx.open_table(&users::TABLE)?;
                let mut posts_tbl = tx.open_table(&posts_public::TABLE)?;
                let mut posts_by_author_tbl = tx.open_table(&posts_public_by_author::TABLE)?;
                let mut posts_seq_tbl = tx.open_table(&posts_seq::TABLE)?;

                if users_tbl.get(&author)?.is_none() {
                    return Ok(WritePostOutcome::AuthorNotFound);
                }

                let id = loop {
                    let id = PublicPostId::generate();
                    if posts_tbl.get(&id)?.is_none() {
                        break id;
                    }
                };
                let record = PublicPostRecord {
                    author,
                    content,
                    date_created: ts,
                    date_modified: ts,
                    seq: Self::next_seq_tx(&mut posts_seq_tbl, |r| &mut r.public)?,
                };
                posts_tbl.insert(&id, &record)?;
                posts_by_author_tbl.insert(&(author, id), &())?;

                Ok(WritePostOutcome::Done(PublicPost::from_record(id, record)))
            })
            .await?;

        debug!(target: LOG_TARGET, post_id = %post.id, author = %post.author, "New public post");
        Ok(post)
    }

    pub async fn get_public_post(&self, id: PublicPostId) -> DbResult<Option<PublicPost>> {
        self.read_with(|tx| {
            let posts_tbl = tx.open_table(&posts_public::TABLE)?;
            Ok(posts_tbl
                .get(&id)?
                .map(|g| PublicPost::from_record(id, g.value())))
        })
        .await
    }

    /// Replace the content of a post authored by `caller`
    ///
    /// Keeps `date_created`, sets `date_modified` to `ts`.
    pub async fn update_public_post(
        &self,
        id: PublicPostId,
        caller: PublicUserId,
        content: PostContent,
        ts: Timestamp,
    ) -> PostResult<PublicPost> {
        self.write_post_with(|tx| {
            let mut posts_tbl = tx.open_table(&posts_public::TABLE)?;

            let Some(mut record) = posts_tbl.get(&id)?.map(|g| g.value()) else {
                return Ok(WritePostOutcome::PostNotFound);
            };
            if record.author != caller {
                return Ok(WritePostOutcome::NotOwner);
            }
            record.content = content;
            record.date_modified = ts;
            posts_tbl.insert(&id, &record)?;

            Ok(WritePostOutcome::Done(PublicPost::from_record(id, record)))
        })
        .await
    }

    pub async fn delete_public_post(&self, id: PublicPostId, caller: PublicUserId) -> PostResult<()> {
        self.write_post_with(|tx| {
            let mut posts_tbl = tx.open_table(&posts_public::TABLE)?;
            let mut posts_by_author_tbl = tx.open_table(&posts_public_by_author::TABLE)?;

            let Some(record) = posts_tbl.get(&id)?.map(|g| g.value()) else {
                return Ok(WritePostOutcome::PostNotFound);
            };
            if record.author != caller {
                return Ok(WritePostOutcome::NotOwner);
            }
            posts_tbl.remove(&id)?;
            posts_by_author_tbl.remove(&(record.author, id))?;

            Ok(WritePostOutcome::Done(()))
        })
        .await
    }

    /// All public posts of `author`, most recently modified first
    pub async fn public_posts_by_author(&self, author: PublicUserId) -> DbResult<Vec<PublicPost>> {
        self.read_with(|tx| {
            let posts_tbl = tx.open_table(&posts_public::TABLE)?;
            let posts_by_author_tbl = tx.open_table(&posts_public_by_author::TABLE)?;

            let mut ret = vec![];
            for id in Self::public_post_ids_by_author_tx(author, &posts_by_author_tbl)? {
                if let Some(record) = posts_tbl.get(&id)?.map(|g| g.value()) {
                    ret.push(PublicPost::from_record(id, record));
                }
            }
            Ok(sorted_by_order_key(ret, PublicPost::order_key))
        })
        .await
    }

    pub fn public_post_ids_by_author_tx(
        author: PublicUserId,
        posts_by_author_tbl: &impl posts_public_by_author::ReadableTable,
    ) -> DbResult<Vec<PublicPostId>> {
        Ok(posts_by_author_tbl
            .range(&(author, PublicPostId::ZERO)..=&(author, PublicPostId::MAX))?
            .map(|res| res.map(|(k, _)| k.value().1))
            .collect::<Result<Vec<_>, _>>()?)
    }
}

// ANONYMOUS POOL
impl Database {
    pub async fn create_anonymous_post(
        &self,
        author: PersonaId,
        content: PostContent,
        ts: Timestamp,
    ) -> PostResult<AnonymousPost> {
        let post = self
            .write_post_with(|tx| {
                let personas_tbl = tx.open_table(&personas::TABLE)?;
                let mut posts_tbl = tx.open_table(&posts_anonymous::TABLE)?;
                let mut posts_by_author_tbl = tx.open_table(&posts_anonymous_by_author::TABLE)?;
                let mut posts_seq_tbl = tx.open_table(&posts_seq::TABLE)?;

                if personas_tbl.get(&author)?.is_none() {
                    return Ok(WritePostOutcome::AuthorNotFound);
                }

                let id = loop {
                    let id = AnonymousPostId::generate();
                    if posts_tbl.get(&id)?.is_none() {
                        break id;
                    }
                };
                let record = AnonymousPostRecord {
                    author,
                    content,
                    date_created: ts,
                    date_modified: ts,
                    seq: Self::next_seq_tx(&mut posts_seq_tbl, |r| &mut r.anonymous)?,
                };
                posts_tbl.insert(&id, &record)?;
                posts_by_author_tbl.insert(&(author, id), &())?;

                Ok(WritePostOutcome::Done(AnonymousPost::from_record(id, record)))
            })
            .await?;

        debug!(target: LOG_TARGET, post_id = %post.id, persona_id = %post.author, "New anonymous post");
        Ok(post)
    }

    pub async fn get_anonymous_post(&self, id: AnonymousPostId) -> DbResult<Option<AnonymousPost>> {
        self.read_with(|tx| {
            let posts_tbl = tx.open_table(&posts_anonymous::TABLE)?;
            Ok(posts_tbl
                .get(&id)?
                .map(|g| AnonymousPost::from_record(id, g.value())))
        })
        .await
    }

    /// Replace the content of an anonymous post
    ///
    /// `caller` is the persona of the acting user. Ownership is decided by
    /// comparing persona ids only.
    pub async fn update_anonymous_post(
        &self,
        id: AnonymousPostId,
        caller: PersonaId,
        content: PostContent,
        ts: Timestamp,
    ) -> PostResult<AnonymousPost> {
        self.write_post_with(|tx| {
            let mut posts_tbl = tx.open_table(&posts_anonymous::TABLE)?;

            let Some(mut record) = posts_tbl.get(&id)?.map(|g| g.value()) else {
                return Ok(WritePostOutcome::PostNotFound);
            };
            if record.author != caller {
                return Ok(WritePostOutcome::NotOwner);
            }
            record.content = content;
            record.date_modified = ts;
            posts_tbl.insert(&id, &record)?;

            Ok(WritePostOutcome::Done(AnonymousPost::from_record(id, record)))
        })
        .await
    }

    pub async fn delete_anonymous_post(
        &self,
        id: AnonymousPostId,
        caller: PersonaId,
    ) -> PostResult<()> {
        self.write_post_with(|tx| {
            let mut posts_tbl = tx.open_table(&posts_anonymous::TABLE)?;
            let mut posts_by_author_tbl = tx.open_table(&posts_anonymous_by_author::TABLE)?;

            let Some(record) = posts_tbl.get(&id)?.map(|g| g.value()) else {
                return Ok(WritePostOutcome::PostNotFound);
            };
            if record.author != caller {
                return Ok(WritePostOutcome::NotOwner);
            }
            posts_tbl.remove(&id)?;
            posts_by_author_tbl.remove(&(record.author, id))?;

            Ok(WritePostOutcome::Done(()))
        })
        .await
    }

    /// Anonymous posts of one persona, most recently modified first
    pub async fn anonymous_posts_by_persona(
        &self,
        author: PersonaId,
    ) -> DbResult<Vec<AnonymousPost>> {
        self.read_with(|tx| {
            let posts_tbl = tx.open_table(&posts_anonymous::TABLE)?;
            let posts_by_author_tbl = tx.open_table(&posts_anonymous_by_author::TABLE)?;

            let mut ret = vec![];
            for id in Self::anonymous_post_ids_by_author_tx(author, &posts_by_author_tbl)? {
                if let Some(record) = posts_tbl.get(&id)?.map(|g| g.value()) {
                    ret.push(AnonymousPost::from_record(id, record));
                }
            }
            Ok(sorted_by_order_key(ret, AnonymousPost::order_key))
        })
        .await
    }

    /// The whole anonymous pool, most recently modified first
    pub async fn anonymous_posts(&self) -> DbResult<Vec<AnonymousPost>> {
        self.read_with(|tx| {
            let posts_tbl = tx.open_table(&posts_anonymous::TABLE)?;

            let ret = posts_tbl
                .range(..)?
                .map(|res| res.map(|(k, v)| AnonymousPost::from_record(k.value(), v.value())))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(sorted_by_order_key(ret, AnonymousPost::order_key))
        })
        .await
    }

    pub fn anonymous_post_ids_by_author_tx(
        author: PersonaId,
        posts_by_author_tbl: &impl posts_anonymous_by_author::ReadableTable,
    ) -> DbResult<Vec<AnonymousPostId>> {
        Ok(posts_by_author_tbl
            .range(&(author, AnonymousPostId::ZERO)..=&(author, AnonymousPostId::MAX))?
            .map(|res| res.map(|(k, _)| k.value().1))
            .collect::<Result<Vec<_>, _>>()?)
    }
}
