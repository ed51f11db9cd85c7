use std::collections::{BTreeSet, HashMap};

use masque_core::id::PublicUserId;
use masque_core::{Mode, Username};
use masque_db::{AnonymousPost, Database, PublicPost, PublicUser};
use masque_util_error::BoxedErrorResult;
use snafu::ResultExt as _;

/// Everything the feed aggregator reads
///
/// Post listings must be sorted by [`masque_core::FeedOrderKey`].
#[async_trait::async_trait]
pub trait FeedStore: Send + Sync {
    async fn mode_of(&self, user_id: PublicUserId) -> BoxedErrorResult<Mode>;

    async fn followees_of(&self, user_id: PublicUserId) -> BoxedErrorResult<BTreeSet<PublicUserId>>;

    async fn get_users(
        &self,
        ids: Vec<PublicUserId>,
    ) -> BoxedErrorResult<HashMap<PublicUserId, PublicUser>>;

    async fn get_user_by_username(&self, username: &Username)
    -> BoxedErrorResult<Option<PublicUser>>;

    async fn public_posts_by_author(&self, author: PublicUserId)
    -> BoxedErrorResult<Vec<PublicPost>>;

    async fn anonymous_posts(&self) -> BoxedErrorResult<Vec<AnonymousPost>>;
}

#[async_trait::async_trait]
impl FeedStore for Database {
    async fn mode_of(&self, user_id: PublicUserId) -> BoxedErrorResult<Mode> {
        Database::mode_of(self, user_id).await.boxed()
    }

    async fn followees_of(&self, user_id: PublicUserId) -> BoxedErrorResult<BTreeSet<PublicUserId>> {
        Database::followees_of(self, user_id).await.boxed()
    }

    async fn get_users(
        &self,
        ids: Vec<PublicUserId>,
    ) -> BoxedErrorResult<HashMap<PublicUserId, PublicUser>> {
        Database::get_users(self, ids).await.boxed()
    }

    async fn get_user_by_username(
        &self,
        username: &Username,
    ) -> BoxedErrorResult<Option<PublicUser>> {
        Database::get_user_by_username(self, username).await.boxed()
    }

    async fn public_posts_by_author(
        &self,
        author: PublicUserId,
    ) -> BoxedErrorResult<Vec<PublicPost>> {
        Database::public_posts_by_author(self, author).await.boxed()
    }

    async fn anonymous_posts(&self) -> BoxedErrorResult<Vec<AnonymousPost>> {
        Database::anonymous_posts(self).await.boxed()
    }
}
