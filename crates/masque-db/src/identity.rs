//! Identity linkage between public users and anonymous personas

use masque_core::Timestamp;
use masque_core::id::{PersonaId, PublicUserId};
use redb_bincode::ReadableTable as _;
use snafu::Snafu;
use tracing::debug;

use crate::{
    Database, DbError, DbResult, LOG_TARGET, PersonaRecord, WriteTransactionCtx, personas,
    personas_by_owner, tables::users,
};

/// Anonymous persona, as seen from the outside
///
/// Carries no reference to the owning public user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnonymousPersona {
    pub id: PersonaId,
    pub date_joined: Timestamp,
}

impl AnonymousPersona {
    fn from_record(id: PersonaId, record: PersonaRecord) -> Self {
        Self {
            id,
            date_joined: record.date_joined,
        }
    }
}

#[derive(Debug, Snafu)]
pub enum PersonaError {
    /// The public user does not exist
    ///
    /// Callers are expected to have checked that already.
    #[snafu(display("User not found"))]
    UserNotFound,
    #[snafu(transparent)]
    Db { source: DbError },
}
pub type PersonaResult<T> = std::result::Result<T, PersonaError>;

pub(crate) enum GetOrCreatePersonaOutcome {
    Existing(AnonymousPersona),
    Created(AnonymousPersona),
    UserNotFound,
}

impl Database {
    /// Get the persona of `user_id`, creating it if it does not exist yet
    ///
    /// Concurrent first calls for the same user converge on a single persona:
    /// the creating write transaction checks the back-reference again, and
    /// write transactions are serialized.
    pub async fn get_or_create_persona(
        &self,
        user_id: PublicUserId,
    ) -> PersonaResult<AnonymousPersona> {
        if let Some(persona) = self.persona_of(user_id).await? {
            return Ok(persona);
        }

        let outcome = self
            .write_with(|tx| {
                let outcome = Self::get_or_create_persona_tx(user_id, tx)?;
                if matches!(outcome, GetOrCreatePersonaOutcome::Created(_)) {
                    self.notify_data_changed_tx(tx);
                }
                Ok(outcome)
            })
            .await?;

        match outcome {
            GetOrCreatePersonaOutcome::Existing(persona) => Ok(persona),
            GetOrCreatePersonaOutcome::Created(persona) => {
                debug!(target: LOG_TARGET, persona_id = %persona.id, "New persona");
                Ok(persona)
            }
            GetOrCreatePersonaOutcome::UserNotFound => UserNotFoundSnafu.fail(),
        }
    }

    pub(crate) fn get_or_create_persona_tx(
        user_id: PublicUserId,
        tx: &WriteTransactionCtx,
    ) -> DbResult<GetOrCreatePersonaOutcome> {
        let users_tbl = tx.open_table(&users::TABLE)?;
        let mut personas_tbl = tx.open_table(&personas::TABLE)?;
        let mut personas_by_owner_tbl = tx.open_table(&personas_by_owner::TABLE)?;

        let Some(user) = Self::get_user_tx(user_id, &users_tbl)? else {
            return Ok(GetOrCreatePersonaOutcome::UserNotFound);
        };

        if let Some(persona) =
            Self::persona_of_tx(user_id, &personas_tbl, &personas_by_owner_tbl)?
        {
            return Ok(GetOrCreatePersonaOutcome::Existing(persona));
        }

        let id = loop {
            let id = PersonaId::generate();
            if personas_tbl.get(&id)?.is_none() {
                break id;
            }
        };
        let record = PersonaRecord {
            owner: user_id,
            date_joined: user.date_joined,
        };

        personas_tbl.insert(&id, &record)?;
        personas_by_owner_tbl.insert(&user_id, &id)?;

        Ok(GetOrCreatePersonaOutcome::Created(
            AnonymousPersona::from_record(id, record),
        ))
    }

    /// Persona of `user_id`, without creating one
    pub async fn persona_of(&self, user_id: PublicUserId) -> DbResult<Option<AnonymousPersona>> {
        self.read_with(|tx| {
            let personas_tbl = tx.open_table(&personas::TABLE)?;
            let personas_by_owner_tbl = tx.open_table(&personas_by_owner::TABLE)?;

            Self::persona_of_tx(user_id, &personas_tbl, &personas_by_owner_tbl)
        })
        .await
    }

    pub fn persona_of_tx(
        user_id: PublicUserId,
        personas_tbl: &impl personas::ReadableTable,
        personas_by_owner_tbl: &impl personas_by_owner::ReadableTable,
    ) -> DbResult<Option<AnonymousPersona>> {
        let Some(persona_id) = personas_by_owner_tbl.get(&user_id)?.map(|g| g.value()) else {
            return Ok(None);
        };
        Self::get_persona_tx(persona_id, personas_tbl)
    }

    pub async fn get_persona(&self, persona_id: PersonaId) -> DbResult<Option<AnonymousPersona>> {
        self.read_with(|tx| {
            let personas_tbl = tx.open_table(&personas::TABLE)?;
            Self::get_persona_tx(persona_id, &personas_tbl)
        })
        .await
    }

    pub fn get_persona_tx(
        persona_id: PersonaId,
        personas_tbl: &impl personas::ReadableTable,
    ) -> DbResult<Option<AnonymousPersona>> {
        Ok(personas_tbl
            .get(&persona_id)?
            .map(|g| AnonymousPersona::from_record(persona_id, g.value())))
    }

    /// Whether `persona_id` belongs to `user_id`
    ///
    /// The owner itself never leaves this crate.
    pub async fn is_persona_owned_by(
        &self,
        persona_id: PersonaId,
        user_id: PublicUserId,
    ) -> DbResult<bool> {
        self.read_with(|tx| {
            let personas_tbl = tx.open_table(&personas::TABLE)?;
            Ok(personas_tbl
                .get(&persona_id)?
                .is_some_and(|g| g.value().owner == user_id))
        })
        .await
    }
}
