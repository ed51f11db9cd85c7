//! User directory

use std::collections::HashMap;

use masque_core::id::{PersonaId, PublicUserId};
use masque_core::{Mode, Timestamp, Username};
use redb_bincode::ReadableTable as _;
use snafu::Snafu;
use tracing::{debug, info};

use crate::{
    Database, DbError, DbResult, LOG_TARGET, PublicUserRecord, WriteTransactionCtx,
    follows_followees, follows_followers, modes, personas, personas_by_owner, posts_anonymous,
    posts_anonymous_by_author, posts_public, posts_public_by_author, tables::users, users_by_username,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicUser {
    pub id: PublicUserId,
    pub username: Username,
    pub date_joined: Timestamp,
}

impl PublicUser {
    fn from_record(id: PublicUserId, record: PublicUserRecord) -> Self {
        Self {
            id,
            username: record.username,
            date_joined: record.date_joined,
        }
    }
}

#[derive(Debug, Snafu)]
pub enum RegisterUserError {
    #[snafu(display("Username already taken"))]
    UsernameTaken,
    #[snafu(transparent)]
    Db { source: DbError },
}
pub type RegisterUserResult<T> = std::result::Result<T, RegisterUserError>;

pub(crate) enum RegisterUserOutcome {
    Registered(PublicUser),
    UsernameTaken,
}

impl Database {
    /// Register a new public user
    ///
    /// The mode flag is created along with the user. The anonymous persona is
    /// not: it is created on first use.
    pub async fn register_user(
        &self,
        username: Username,
        ts: Timestamp,
    ) -> RegisterUserResult<PublicUser> {
        let outcome = self
            .write_with(|tx| {
                let outcome = Self::insert_user_tx(username, ts, tx)?;
                if matches!(outcome, RegisterUserOutcome::Registered(_)) {
                    self.notify_data_changed_tx(tx);
                }
                Ok(outcome)
            })
            .await?;

        match outcome {
            RegisterUserOutcome::Registered(user) => {
                info!(target: LOG_TARGET, user_id = %user.id, username = %user.username, "New user");
                Ok(user)
            }
            RegisterUserOutcome::UsernameTaken => UsernameTakenSnafu.fail(),
        }
    }

    pub(crate) fn insert_user_tx(
        username: Username,
        ts: Timestamp,
        tx: &WriteTransactionCtx,
    ) -> DbResult<RegisterUserOutcome> {
        let mut users_tbl = tx.open_table(&users::TABLE)?;
        let mut users_by_username_tbl = tx.open_table(&users_by_username::TABLE)?;
        let mut modes_tbl = tx.open_table(&modes::TABLE)?;

        if users_by_username_tbl.get(&username)?.is_some() {
            return Ok(RegisterUserOutcome::UsernameTaken);
        }

        let id = loop {
            let id = PublicUserId::generate();
            if users_tbl.get(&id)?.is_none() {
                break id;
            }
        };

        users_tbl.insert(
            &id,
            &PublicUserRecord {
                username: username.clone(),
                date_joined: ts,
            },
        )?;
        users_by_username_tbl.insert(&username, &id)?;
        modes_tbl.insert(&id, &Mode::Public)?;

        Ok(RegisterUserOutcome::Registered(PublicUser {
            id,
            username,
            date_joined: ts,
        }))
    }

    pub async fn get_user(&self, id: PublicUserId) -> DbResult<Option<PublicUser>> {
        self.read_with(|tx| {
            let users_tbl = tx.open_table(&users::TABLE)?;
            Self::get_user_tx(id, &users_tbl)
        })
        .await
    }

    pub fn get_user_tx(
        id: PublicUserId,
        users_tbl: &impl users::ReadableTable,
    ) -> DbResult<Option<PublicUser>> {
        Ok(users_tbl
            .get(&id)?
            .map(|g| PublicUser::from_record(id, g.value())))
    }

    pub async fn get_user_by_username(&self, username: &Username) -> DbResult<Option<PublicUser>> {
        self.read_with(|tx| {
            let users_tbl = tx.open_table(&users::TABLE)?;
            let users_by_username_tbl = tx.open_table(&users_by_username::TABLE)?;

            let Some(id) = users_by_username_tbl.get(username)?.map(|g| g.value()) else {
                return Ok(None);
            };
            Self::get_user_tx(id, &users_tbl)
        })
        .await
    }

    /// Look up many users at once, e.g. to turn ids into usernames
    ///
    /// Ids of users that do not exist are simply missing in the result.
    pub async fn get_users(
        &self,
        ids: impl IntoIterator<Item = PublicUserId>,
    ) -> DbResult<HashMap<PublicUserId, PublicUser>> {
        self.read_with(|tx| {
            let users_tbl = tx.open_table(&users::TABLE)?;

            let mut ret = HashMap::new();
            for id in ids {
                if let Some(user) = Self::get_user_tx(id, &users_tbl)? {
                    ret.insert(id, user);
                }
            }
            Ok(ret)
        })
        .await
    }

    /// Delete a user and everything bound to them
    ///
    /// Returns `false` if the user did not exist.
    pub async fn delete_user(&self, id: PublicUserId) -> DbResult<bool> {
        let deleted = self
            .write_with(|tx| {
                let deleted = Self::delete_user_tx(id, tx)?;
                if deleted {
                    self.notify_data_changed_tx(tx);
                }
                Ok(deleted)
            })
            .await?;

        if deleted {
            info!(target: LOG_TARGET, user_id = %id, "User deleted");
        }
        Ok(deleted)
    }

    pub(crate) fn delete_user_tx(id: PublicUserId, tx: &WriteTransactionCtx) -> DbResult<bool> {
        let mut users_tbl = tx.open_table(&users::TABLE)?;
        let mut users_by_username_tbl = tx.open_table(&users_by_username::TABLE)?;

        let Some(record) = users_tbl.remove(&id)?.map(|g| g.value()) else {
            return Ok(false);
        };
        users_by_username_tbl.remove(&record.username)?;

        tx.open_table(&modes::TABLE)?.remove(&id)?;

        if let Some(persona_id) = tx
            .open_table(&personas_by_owner::TABLE)?
            .remove(&id)?
            .map(|g| g.value())
        {
            Self::delete_persona_tx(persona_id, tx)?;
        }

        {
            let mut posts_tbl = tx.open_table(&posts_public::TABLE)?;
            let mut posts_by_author_tbl = tx.open_table(&posts_public_by_author::TABLE)?;

            let post_ids = Self::public_post_ids_by_author_tx(id, &posts_by_author_tbl)?;
            for post_id in post_ids {
                posts_tbl.remove(&post_id)?;
                posts_by_author_tbl.remove(&(id, post_id))?;
            }
        }

        {
            let mut followees_tbl = tx.open_table(&follows_followees::TABLE)?;
            let mut followers_tbl = tx.open_table(&follows_followers::TABLE)?;

            let followees = Self::read_followees_tx(id, &followees_tbl)?;
            for followee in followees.keys() {
                followees_tbl.remove(&(id, *followee))?;
                followers_tbl.remove(&(*followee, id))?;
            }

            let followers = Self::read_followers_tx(id, &followers_tbl)?;
            for follower in followers.keys() {
                followers_tbl.remove(&(id, *follower))?;
                followees_tbl.remove(&(*follower, id))?;
            }
        }

        Ok(true)
    }

    /// Remove a persona with all its anonymous posts
    ///
    /// The back-reference is expected to be removed by the caller.
    fn delete_persona_tx(persona_id: PersonaId, tx: &WriteTransactionCtx) -> DbResult<()> {
        tx.open_table(&personas::TABLE)?.remove(&persona_id)?;

        let mut posts_tbl = tx.open_table(&posts_anonymous::TABLE)?;
        let mut posts_by_author_tbl = tx.open_table(&posts_anonymous_by_author::TABLE)?;

        let post_ids = Self::anonymous_post_ids_by_author_tx(persona_id, &posts_by_author_tbl)?;
        let count = post_ids.len();
        for post_id in post_ids {
            posts_tbl.remove(&post_id)?;
            posts_by_author_tbl.remove(&(persona_id, post_id))?;
        }
        debug!(target: LOG_TARGET, %persona_id, count, "Persona deleted");
        Ok(())
    }
}
