use std::sync::Arc;

use futures::future;
use itertools::Itertools as _;
use masque_core::id::PublicUserId;
use masque_core::{Mode, Username};
use masque_util_error::BoxedError;
use snafu::{OptionExt as _, ResultExt as _, Snafu};
use tracing::{debug, instrument};

use crate::view::{AnonymousPostView, Feed, PublicPostView};
use crate::{FeedStore, LOG_TARGET};

#[derive(Debug, Snafu)]
pub enum FeedError {
    #[snafu(display("Author not found: {username}"))]
    AuthorNotFound { username: Username },
    #[snafu(display("Feed store read failed"))]
    Store { source: BoxedError },
}
pub type FeedResult<T> = std::result::Result<T, FeedError>;

/// Builds feeds out of the follow graph and the post pools
///
/// For an unchanged store, building the same feed twice returns the same posts
/// in the same order: posts are ordered by [`masque_core::FeedOrderKey`], and
/// no two posts of a pool share one.
#[derive(Clone)]
pub struct FeedAggregator {
    store: Arc<dyn FeedStore>,
}

impl FeedAggregator {
    pub fn new(store: Arc<dyn FeedStore>) -> Self {
        Self { store }
    }

    /// Feed of `user_id`, drawn from the pool selected by their mode
    #[instrument(skip_all, fields(%user_id))]
    pub async fn build_feed(&self, user_id: PublicUserId) -> FeedResult<Feed> {
        let mode = self.store.mode_of(user_id).await.context(StoreSnafu)?;

        Ok(match mode {
            Mode::Public => Feed::Public(self.build_public_feed(user_id).await?),
            Mode::Anonymous => Feed::Anonymous(self.build_anonymous_feed().await?),
        })
    }

    /// Public posts of everyone `user_id` follows, merged
    ///
    /// Posts of all followees are fetched concurrently. Failure to read any of
    /// them fails the whole feed.
    pub async fn build_public_feed(&self, user_id: PublicUserId) -> FeedResult<Vec<PublicPostView>> {
        let followees = self.store.followees_of(user_id).await.context(StoreSnafu)?;
        if followees.is_empty() {
            return Ok(vec![]);
        }

        let (authors, per_followee) = future::try_join(
            self.store.get_users(followees.iter().copied().collect()),
            future::try_join_all(
                followees
                    .iter()
                    .map(|followee| self.store.public_posts_by_author(*followee)),
            ),
        )
        .await
        .context(StoreSnafu)?;

        let mut ret = vec![];
        for post in per_followee
            .into_iter()
            .kmerge_by(|a, b| a.order_key() < b.order_key())
        {
            // Deleted in the meantime, and its posts along with it
            let Some(author) = authors.get(&post.author) else {
                debug!(target: LOG_TARGET, author = %post.author, "Skipping post of a gone author");
                continue;
            };
            ret.push(PublicPostView::public(&post, author));
        }

        debug!(
            target: LOG_TARGET,
            %user_id,
            followees = followees.len(),
            posts = ret.len(),
            "Built public feed"
        );
        Ok(ret)
    }

    /// The whole anonymous pool
    pub async fn build_anonymous_feed(&self) -> FeedResult<Vec<AnonymousPostView>> {
        Ok(self
            .store
            .anonymous_posts()
            .await
            .context(StoreSnafu)?
            .iter()
            .map(AnonymousPostView::anonymous)
            .collect())
    }

    /// Public posts of a single author
    ///
    /// Only ever the public pool: a username never resolves to anything in the
    /// anonymous one.
    #[instrument(skip_all, fields(%viewer, %author_username))]
    pub async fn build_author_feed(
        &self,
        viewer: PublicUserId,
        author_username: &Username,
    ) -> FeedResult<Vec<PublicPostView>> {
        let author = self
            .store
            .get_user_by_username(author_username)
            .await
            .context(StoreSnafu)?
            .context(AuthorNotFoundSnafu {
                username: author_username.clone(),
            })?;

        Ok(self
            .store
            .public_posts_by_author(author.id)
            .await
            .context(StoreSnafu)?
            .iter()
            .map(|post| PublicPostView::public(post, &author))
            .collect())
    }
}
