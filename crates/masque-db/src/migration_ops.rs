use redb_bincode::ReadableTable as _;
use tracing::{debug, info};

use crate::{
    Database, DbResult, DbVersionTooHighSnafu, LOG_TARGET, WriteTransactionCtx, db_version,
    follows_followees, follows_followers, modes, personas, personas_by_owner, posts_anonymous,
    posts_anonymous_by_author, posts_public, posts_public_by_author, posts_seq, tables::users,
    users_by_username,
};

impl Database {
    pub const DB_VER: u64 = 1;

    pub(crate) fn init_tables_tx(tx: &WriteTransactionCtx) -> DbResult<()> {
        tx.open_table(&db_version::TABLE)?;

        tx.open_table(&users::TABLE)?;
        tx.open_table(&users_by_username::TABLE)?;

        tx.open_table(&personas::TABLE)?;
        tx.open_table(&personas_by_owner::TABLE)?;

        tx.open_table(&modes::TABLE)?;

        tx.open_table(&follows_followees::TABLE)?;
        tx.open_table(&follows_followers::TABLE)?;

        tx.open_table(&posts_public::TABLE)?;
        tx.open_table(&posts_public_by_author::TABLE)?;
        tx.open_table(&posts_anonymous::TABLE)?;
        tx.open_table(&posts_anonymous_by_author::TABLE)?;
        tx.open_table(&posts_seq::TABLE)?;
        Ok(())
    }

    pub(crate) fn handle_db_ver_migrations(dbtx: &WriteTransactionCtx) -> DbResult<()> {
        let mut table_db_ver = dbtx.open_table(&db_version::TABLE)?;

        let Some(cur_db_ver) = table_db_ver.first()?.map(|g| g.1.value()) else {
            info!(target: LOG_TARGET, "Initializing new database");
            table_db_ver.insert(&(), &Self::DB_VER)?;

            return Ok(());
        };

        if Self::DB_VER < cur_db_ver {
            return DbVersionTooHighSnafu {
                db_ver: cur_db_ver,
                code_ver: Self::DB_VER,
            }
            .fail();
        }

        // First schema version, nothing to migrate from yet.
        table_db_ver.insert(&(), &Self::DB_VER)?;
        debug!(target: LOG_TARGET, db_ver = Self::DB_VER, "Db version");

        Ok(())
    }
}
