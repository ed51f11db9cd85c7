//! Outward-facing representations
//!
//! Every type here is built field by field from what it may show. In
//! particular nothing built from an anonymous post or a persona has access to
//! the public user behind it: the constructors just don't take one.

use masque_core::id::{AnonymousPostId, FollowId, PersonaId, PublicPostId, PublicUserId};
use masque_core::{PostContent, Timestamp, Username};
use masque_db::{AnonymousPersona, AnonymousPost, FollowEdge, PublicPost, PublicUser};
use serde::{Serialize, Serializer};

fn rfc3339<S>(ts: &Timestamp, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.collect_str(ts)
}

/// A post as shown in feeds and listings
///
/// `author_handle` is a username for public posts and a persona id for
/// anonymous ones.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PostView<Id, Handle> {
    id: Id,
    author_handle: Handle,
    content: PostContent,
    #[serde(serialize_with = "rfc3339")]
    date_created: Timestamp,
    #[serde(serialize_with = "rfc3339")]
    date_modified: Timestamp,
}

pub type PublicPostView = PostView<PublicPostId, Username>;
pub type AnonymousPostView = PostView<AnonymousPostId, PersonaId>;

impl<Id, Handle> PostView<Id, Handle> {
    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn author_handle(&self) -> &Handle {
        &self.author_handle
    }

    pub fn content(&self) -> &PostContent {
        &self.content
    }

    pub fn date_created(&self) -> Timestamp {
        self.date_created
    }

    pub fn date_modified(&self) -> Timestamp {
        self.date_modified
    }
}

impl PostView<PublicPostId, Username> {
    /// `author` must be the author of `post`
    pub fn public(post: &PublicPost, author: &PublicUser) -> Self {
        debug_assert_eq!(post.author, author.id);
        Self {
            id: post.id,
            author_handle: author.username.clone(),
            content: post.content.clone(),
            date_created: post.date_created,
            date_modified: post.date_modified,
        }
    }
}

impl PostView<AnonymousPostId, PersonaId> {
    pub fn anonymous(post: &AnonymousPost) -> Self {
        Self {
            id: post.id,
            author_handle: post.author,
            content: post.content.clone(),
            date_created: post.date_created,
            date_modified: post.date_modified,
        }
    }
}

/// Feed of a user, drawn from the pool selected by their mode
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "mode", content = "posts", rename_all = "snake_case")]
pub enum Feed {
    Public(Vec<PublicPostView>),
    Anonymous(Vec<AnonymousPostView>),
}

impl Feed {
    pub fn len(&self) -> usize {
        match self {
            Feed::Public(posts) => posts.len(),
            Feed::Anonymous(posts) => posts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Persona of the caller, shown to the caller only
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersonaView {
    pub persona_id: PersonaId,
    #[serde(serialize_with = "rfc3339")]
    pub date_joined: Timestamp,
}

impl From<AnonymousPersona> for PersonaView {
    fn from(persona: AnonymousPersona) -> Self {
        Self {
            persona_id: persona.id,
            date_joined: persona.date_joined,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UserView {
    pub id: PublicUserId,
    pub username: Username,
    #[serde(serialize_with = "rfc3339")]
    pub date_joined: Timestamp,
}

impl From<PublicUser> for UserView {
    fn from(user: PublicUser) -> Self {
        Self {
            id: user.id,
            username: user.username,
            date_joined: user.date_joined,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ModeView {
    pub username: Username,
    pub is_anonymous: bool,
}

/// Follow edge with both ends resolved to usernames
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FollowView {
    pub id: FollowId,
    pub followee: Username,
    pub follower: Username,
    #[serde(serialize_with = "rfc3339")]
    pub date_created: Timestamp,
}

impl FollowView {
    pub fn new(edge: &FollowEdge, follower: &PublicUser, followee: &PublicUser) -> Self {
        debug_assert_eq!(edge.follower, follower.id);
        debug_assert_eq!(edge.followee, followee.id);
        Self {
            id: edge.id,
            followee: followee.username.clone(),
            follower: follower.username.clone(),
            date_created: edge.date_created,
        }
    }
}
