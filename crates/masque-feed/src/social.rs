//! Request-level operations
//!
//! Each operation takes the already-resolved caller, validates everything,
//! and only then performs (at most) one mutation.

use std::sync::Arc;

use masque_core::id::{AnonymousPostId, PersonaId, PublicPostId, PublicUserId};
use masque_core::{
    ContentValidationError, Mode, PostContent, Timestamp, Username, UsernameValidationError,
};
use masque_db::{
    Database, DbError, FollowError, PersonaError, PostError, PublicUser, RegisterUserError,
    SetModeError, UnfollowError,
};
use snafu::{OptionExt as _, ResultExt as _, Snafu, ensure};
use tracing::{debug, info};

use crate::view::{
    AnonymousPostView, FollowView, ModeView, PersonaView, PublicPostView, UserView,
};
use crate::{Feed, FeedAggregator, FeedCache, FeedError, LOG_TARGET};

/// Broad class of a [`SocialError`], what outer layers map to status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocialErrorKind {
    /// Malformed or missing input, nothing was changed
    Validation,
    ContentTooLong,
    /// Not logged in, or not the owner
    Forbidden,
    NotFound,
    /// Conflicting state, nothing was changed
    Conflict,
    Internal,
}

#[derive(Debug, Snafu)]
pub enum SocialError {
    #[snafu(display("Invalid username"))]
    InvalidUsername { source: UsernameValidationError },
    #[snafu(display("Invalid content"))]
    InvalidContent { source: ContentValidationError },
    #[snafu(display("Username already taken"))]
    UsernameTaken,
    #[snafu(display("Not logged in"))]
    NotLoggedIn,
    #[snafu(display("Not the owner"))]
    NotOwner,
    #[snafu(display("User not found: {username}"))]
    UserNotFound { username: Username },
    #[snafu(display("Post not found"))]
    PostNotFound,
    #[snafu(display("Persona not found"))]
    PersonaNotFound,
    #[snafu(display("Can't follow yourself"))]
    SelfFollow,
    #[snafu(display("Can't unfollow yourself"))]
    SelfUnfollow,
    #[snafu(display("Already following {username}"))]
    AlreadyFollowing { username: Username },
    #[snafu(display("Not following {username}"))]
    NotFollowing { username: Username },
    #[snafu(transparent)]
    Db { source: DbError },
    #[snafu(transparent)]
    Feed { source: FeedError },
}
pub type SocialResult<T> = std::result::Result<T, SocialError>;

impl SocialError {
    pub fn kind(&self) -> SocialErrorKind {
        match self {
            SocialError::InvalidUsername { .. }
            | SocialError::SelfFollow
            | SocialError::SelfUnfollow => SocialErrorKind::Validation,
            SocialError::InvalidContent { source } => match source {
                ContentValidationError::TooLong { .. } => SocialErrorKind::ContentTooLong,
                ContentValidationError::Empty => SocialErrorKind::Validation,
            },
            SocialError::NotLoggedIn | SocialError::NotOwner => SocialErrorKind::Forbidden,
            SocialError::UserNotFound { .. }
            | SocialError::PostNotFound
            | SocialError::PersonaNotFound
            | SocialError::Feed {
                source: FeedError::AuthorNotFound { .. },
            } => SocialErrorKind::NotFound,
            SocialError::UsernameTaken
            | SocialError::AlreadyFollowing { .. }
            | SocialError::NotFollowing { .. } => SocialErrorKind::Conflict,
            SocialError::Db { .. } | SocialError::Feed { .. } => SocialErrorKind::Internal,
        }
    }
}

impl From<PostError> for SocialError {
    fn from(err: PostError) -> Self {
        match err {
            // Authors are always the (existing) caller or their persona
            PostError::AuthorNotFound => SocialError::NotLoggedIn,
            PostError::PostNotFound => SocialError::PostNotFound,
            PostError::NotOwner => SocialError::NotOwner,
            PostError::Db { source } => SocialError::Db { source },
        }
    }
}

impl From<PersonaError> for SocialError {
    fn from(err: PersonaError) -> Self {
        match err {
            PersonaError::UserNotFound => SocialError::NotLoggedIn,
            PersonaError::Db { source } => SocialError::Db { source },
        }
    }
}

/// Everything a request can do
///
/// Owns the feed cache, so there's no state shared between instances.
pub struct Social {
    db: Arc<Database>,
    aggregator: FeedAggregator,
    feed_cache: FeedCache,
}

impl Social {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            aggregator: FeedAggregator::new(db.clone()),
            db,
            feed_cache: FeedCache::new(),
        }
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    /// Resolve the caller supplied by the session layer
    pub async fn caller(&self, user_id: PublicUserId) -> SocialResult<PublicUser> {
        self.db.get_user(user_id).await?.context(NotLoggedInSnafu)
    }

    async fn resolve_username(&self, username: &str) -> SocialResult<PublicUser> {
        let username = Username::new(username).context(InvalidUsernameSnafu)?;
        self.db
            .get_user_by_username(&username)
            .await?
            .context(UserNotFoundSnafu { username })
    }

    pub async fn register_user(&self, username: &str) -> SocialResult<UserView> {
        let username = Username::new(username).context(InvalidUsernameSnafu)?;

        match self.db.register_user(username, Timestamp::now()).await {
            Ok(user) => Ok(user.into()),
            Err(RegisterUserError::UsernameTaken) => UsernameTakenSnafu.fail(),
            Err(RegisterUserError::Db { source }) => Err(source.into()),
        }
    }

    pub async fn delete_self(&self, caller: &PublicUser) -> SocialResult<()> {
        if !self.db.delete_user(caller.id).await? {
            return NotLoggedInSnafu.fail();
        }
        Ok(())
    }

    /// Persona of the caller, created on first use
    pub async fn persona(&self, caller: &PublicUser) -> SocialResult<PersonaView> {
        Ok(self.db.get_or_create_persona(caller.id).await?.into())
    }

    pub async fn mode(&self, caller: &PublicUser) -> SocialResult<ModeView> {
        let mode = self.db.mode_of(caller.id).await?;
        Ok(ModeView {
            username: caller.username.clone(),
            is_anonymous: mode.is_anonymous(),
        })
    }

    pub async fn set_mode(&self, caller: &PublicUser, is_anonymous: bool) -> SocialResult<ModeView> {
        match self
            .db
            .set_mode(caller.id, Mode::from_is_anonymous(is_anonymous))
            .await
        {
            Ok(()) => {}
            Err(SetModeError::UserNotFound) => return NotLoggedInSnafu.fail(),
            Err(SetModeError::Db { source }) => return Err(source.into()),
        }
        Ok(ModeView {
            username: caller.username.clone(),
            is_anonymous,
        })
    }

    pub async fn follow(&self, caller: &PublicUser, followee: &str) -> SocialResult<FollowView> {
        let followee = self.resolve_username(followee).await?;

        let edge = match self.db.follow(caller.id, followee.id, Timestamp::now()).await {
            Ok(edge) => edge,
            Err(FollowError::SelfFollow) => return SelfFollowSnafu.fail(),
            Err(FollowError::AlreadyFollowing) => {
                return AlreadyFollowingSnafu {
                    username: followee.username,
                }
                .fail();
            }
            Err(FollowError::UserNotFound) => {
                return UserNotFoundSnafu {
                    username: followee.username,
                }
                .fail();
            }
            Err(FollowError::Db { source }) => return Err(source.into()),
        };

        info!(target: LOG_TARGET, follower = %caller.username, followee = %followee.username, "Follow");
        Ok(FollowView::new(&edge, caller, &followee))
    }

    pub async fn unfollow(&self, caller: &PublicUser, followee: &str) -> SocialResult<()> {
        let followee = self.resolve_username(followee).await?;
        if followee.id == caller.id {
            return SelfUnfollowSnafu.fail();
        }

        match self.db.unfollow(caller.id, followee.id).await {
            Ok(()) => {}
            Err(UnfollowError::NotFollowing) => {
                return NotFollowingSnafu {
                    username: followee.username,
                }
                .fail();
            }
            Err(UnfollowError::Db { source }) => return Err(source.into()),
        }

        info!(target: LOG_TARGET, follower = %caller.username, followee = %followee.username, "Unfollow");
        Ok(())
    }

    /// Users the caller follows
    pub async fn following(&self, caller: &PublicUser) -> SocialResult<Vec<FollowView>> {
        let edges = self.db.followee_edges(caller.id).await?;
        let users = self
            .db
            .get_users(edges.iter().map(|edge| edge.followee))
            .await?;

        Ok(edges
            .iter()
            .filter_map(|edge| {
                let followee = users.get(&edge.followee)?;
                Some(FollowView::new(edge, caller, followee))
            })
            .collect())
    }

    /// Users following the caller
    pub async fn followers(&self, caller: &PublicUser) -> SocialResult<Vec<FollowView>> {
        let edges = self.db.follower_edges(caller.id).await?;
        let users = self
            .db
            .get_users(edges.iter().map(|edge| edge.follower))
            .await?;

        Ok(edges
            .iter()
            .filter_map(|edge| {
                let follower = users.get(&edge.follower)?;
                Some(FollowView::new(edge, follower, caller))
            })
            .collect())
    }

    /// Feed of the caller, in their current mode
    pub async fn feed(&self, caller: &PublicUser) -> SocialResult<Feed> {
        // Read before building, so a write racing with the build leaves the
        // cached entry stale rather than wrong.
        let data_version = self.db.data_version();
        if let Some(feed) = self.feed_cache.get(caller.id, data_version) {
            debug!(target: LOG_TARGET, user_id = %caller.id, "Feed cache hit");
            return Ok(feed);
        }

        let feed = self.aggregator.build_feed(caller.id).await?;
        self.feed_cache.insert(caller.id, data_version, feed.clone());
        Ok(feed)
    }

    /// Public posts of one author
    pub async fn author_feed(
        &self,
        caller: &PublicUser,
        author: &str,
    ) -> SocialResult<Vec<PublicPostView>> {
        let author = Username::new(author).context(InvalidUsernameSnafu)?;
        Ok(self.aggregator.build_author_feed(caller.id, &author).await?)
    }

    pub async fn create_post(&self, caller: &PublicUser, content: &str) -> SocialResult<PublicPostView> {
        let content = PostContent::new(content).context(InvalidContentSnafu)?;
        let post = self
            .db
            .create_public_post(caller.id, content, Timestamp::now())
            .await?;
        Ok(PublicPostView::public(&post, caller))
    }

    pub async fn update_post(
        &self,
        caller: &PublicUser,
        post_id: PublicPostId,
        content: &str,
    ) -> SocialResult<PublicPostView> {
        let post = self
            .db
            .get_public_post(post_id)
            .await?
            .context(PostNotFoundSnafu)?;
        ensure!(post.author == caller.id, NotOwnerSnafu);

        let content = PostContent::new(content).context(InvalidContentSnafu)?;
        let post = self
            .db
            .update_public_post(post_id, caller.id, content, Timestamp::now())
            .await?;
        Ok(PublicPostView::public(&post, caller))
    }

    pub async fn delete_post(&self, caller: &PublicUser, post_id: PublicPostId) -> SocialResult<()> {
        self.db.delete_public_post(post_id, caller.id).await?;
        Ok(())
    }

    /// The anonymous pool, or the posts of one persona in it
    pub async fn anonymous_posts(
        &self,
        author: Option<PersonaId>,
    ) -> SocialResult<Vec<AnonymousPostView>> {
        let posts = match author {
            Some(persona_id) => {
                self.db
                    .get_persona(persona_id)
                    .await?
                    .context(PersonaNotFoundSnafu)?;
                self.db.anonymous_posts_by_persona(persona_id).await?
            }
            None => self.db.anonymous_posts().await?,
        };
        Ok(posts.iter().map(AnonymousPostView::anonymous).collect())
    }

    /// Post to the anonymous pool as the caller's persona
    pub async fn create_anonymous_post(
        &self,
        caller: &PublicUser,
        content: &str,
    ) -> SocialResult<AnonymousPostView> {
        let content = PostContent::new(content).context(InvalidContentSnafu)?;
        let persona = self.db.get_or_create_persona(caller.id).await?;
        let post = self
            .db
            .create_anonymous_post(persona.id, content, Timestamp::now())
            .await?;
        Ok(AnonymousPostView::anonymous(&post))
    }

    /// Edit an anonymous post
    ///
    /// Allowed only if the post's author is the caller's own persona. The
    /// post's author is never resolved back to a public user.
    pub async fn update_anonymous_post(
        &self,
        caller: &PublicUser,
        post_id: AnonymousPostId,
        content: &str,
    ) -> SocialResult<AnonymousPostView> {
        let persona_id = self.editing_persona(caller, post_id).await?;
        let content = PostContent::new(content).context(InvalidContentSnafu)?;
        let post = self
            .db
            .update_anonymous_post(post_id, persona_id, content, Timestamp::now())
            .await?;
        Ok(AnonymousPostView::anonymous(&post))
    }

    pub async fn delete_anonymous_post(
        &self,
        caller: &PublicUser,
        post_id: AnonymousPostId,
    ) -> SocialResult<()> {
        let persona_id = self.editing_persona(caller, post_id).await?;
        self.db.delete_anonymous_post(post_id, persona_id).await?;
        Ok(())
    }

    /// Persona the caller edits `post_id` as
    ///
    /// Fails unless the post exists and its author is the caller's own
    /// persona. A caller without a persona yet can't own any anonymous post,
    /// and doesn't get one created just for a rejected edit.
    async fn editing_persona(
        &self,
        caller: &PublicUser,
        post_id: AnonymousPostId,
    ) -> SocialResult<PersonaId> {
        let post = self
            .db
            .get_anonymous_post(post_id)
            .await?
            .context(PostNotFoundSnafu)?;
        let persona = self
            .db
            .persona_of(caller.id)
            .await?
            .context(NotOwnerSnafu)?;
        ensure!(post.author == persona.id, NotOwnerSnafu);

        Ok(persona.id)
    }
}
