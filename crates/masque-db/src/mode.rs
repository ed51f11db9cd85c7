use masque_core::Mode;
use masque_core::id::PublicUserId;
use redb_bincode::ReadableTable as _;
use snafu::Snafu;
use tracing::debug;

use crate::{Database, DbError, DbResult, LOG_TARGET, modes, tables::users};

#[derive(Debug, Snafu)]
pub enum SetModeError {
    #[snafu(display("User not found"))]
    UserNotFound,
    #[snafu(transparent)]
    Db { source: DbError },
}
pub type SetModeResult<T> = std::result::Result<T, SetModeError>;

impl Database {
    /// Set the mode of `user_id`, overwriting the previous one
    pub async fn set_mode(&self, user_id: PublicUserId, mode: Mode) -> SetModeResult<()> {
        let updated = self
            .write_with(|tx| {
                let users_tbl = tx.open_table(&users::TABLE)?;
                let mut modes_tbl = tx.open_table(&modes::TABLE)?;

                if users_tbl.get(&user_id)?.is_none() {
                    return Ok(false);
                }

                let prev = modes_tbl.get(&user_id)?.map(|g| g.value());
                if prev != Some(mode) {
                    modes_tbl.insert(&user_id, &mode)?;
                    self.notify_data_changed_tx(tx);
                }
                Ok(true)
            })
            .await?;

        if !updated {
            return UserNotFoundSnafu.fail();
        }
        debug!(target: LOG_TARGET, %user_id, ?mode, "Mode set");
        Ok(())
    }

    /// Mode of `user_id`, [`Mode::Public`] if never set
    pub async fn mode_of(&self, user_id: PublicUserId) -> DbResult<Mode> {
        self.read_with(|tx| {
            let modes_tbl = tx.open_table(&modes::TABLE)?;
            Self::mode_of_tx(user_id, &modes_tbl)
        })
        .await
    }

    pub fn mode_of_tx(user_id: PublicUserId, modes_tbl: &impl modes::ReadableTable) -> DbResult<Mode> {
        Ok(modes_tbl
            .get(&user_id)?
            .map(|g| g.value())
            .unwrap_or_default())
    }
}
