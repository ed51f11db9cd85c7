use bincode::{Decode, Encode};
use masque_core::id::{AnonymousPostId, FollowId, PersonaId, PublicPostId, PublicUserId};
use masque_core::{Mode, PostContent, Timestamp, Username};
use serde::Serialize;

#[macro_export]
macro_rules! def_table {
    ($(#[$outer:meta])*
        $name:ident : $k:ty => $v:ty) => {
        #[allow(unused)]
        $(#[$outer])*
        pub mod $name {
            use super::*;
            pub type Key = $k;
            pub type Value = $v;
            pub type Definition<'a> = redb_bincode::TableDefinition<'a, Key, Value>;
            pub trait ReadableTable: redb_bincode::ReadableTable<Key, Value> {}
            impl<RT> ReadableTable for RT where RT: redb_bincode::ReadableTable<Key, Value> {}
            pub type Table<'a> = redb_bincode::Table<'a, Key, Value>;
            pub const TABLE: Definition = redb_bincode::TableDefinition::new(stringify!($name));
        }
    };
}

def_table! {
    /// Tracks database/schema version
    db_version: () => u64
}

// USERS
def_table!(users: PublicUserId => PublicUserRecord);
def_table!(users_by_username: Username => PublicUserId);

// IDENTITY LINKAGE
def_table! {
    /// Anonymous personas
    ///
    /// The owner is only ever read back for self-authorization.
    personas: PersonaId => PersonaRecord
}
def_table! {
    /// Back-reference from a public user to its only persona
    ///
    /// Being keyed by the owner, it is also what makes a second persona for the
    /// same user impossible.
    personas_by_owner: PublicUserId => PersonaId
}

// MODE
def_table!(modes: PublicUserId => Mode);

// FOLLOW GRAPH
def_table! {
    /// `(follower, followee)`
    follows_followees: (PublicUserId, PublicUserId) => FollowRecord
}
def_table! {
    /// `(followee, follower)`, mirror of [`follows_followees`]
    follows_followers: (PublicUserId, PublicUserId) => FollowRecord
}

// POSTS
def_table!(posts_public: PublicPostId => PublicPostRecord);
def_table!(posts_public_by_author: (PublicUserId, PublicPostId) => ());
def_table!(posts_anonymous: AnonymousPostId => AnonymousPostRecord);
def_table!(posts_anonymous_by_author: (PersonaId, AnonymousPostId) => ());
def_table! {
    /// Next insertion sequence number of each post pool
    posts_seq: () => PostsSeqRecord
}

#[derive(Debug, Encode, Decode, Serialize, Clone)]
pub struct PublicUserRecord {
    pub username: Username,
    pub date_joined: Timestamp,
}

#[derive(Debug, Encode, Decode, Serialize, Clone, Copy)]
pub struct PersonaRecord {
    pub owner: PublicUserId,
    /// Copied from the owner's join date at creation
    pub date_joined: Timestamp,
}

#[derive(Debug, Encode, Decode, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct FollowRecord {
    pub id: FollowId,
    pub ts: Timestamp,
}

#[derive(Debug, Encode, Decode, Serialize, Clone)]
pub struct PublicPostRecord {
    pub author: PublicUserId,
    pub content: PostContent,
    pub date_created: Timestamp,
    pub date_modified: Timestamp,
    pub seq: u64,
}

#[derive(Debug, Encode, Decode, Serialize, Clone)]
pub struct AnonymousPostRecord {
    pub author: PersonaId,
    pub content: PostContent,
    pub date_created: Timestamp,
    pub date_modified: Timestamp,
    pub seq: u64,
}

#[derive(Debug, Encode, Decode, Serialize, Clone, Copy, Default)]
pub struct PostsSeqRecord {
    pub public: u64,
    pub anonymous: u64,
}
