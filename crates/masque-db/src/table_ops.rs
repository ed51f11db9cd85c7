use redb_bincode::{ReadTransaction, ReadableTable as _};
use snafu::ResultExt as _;

use crate::{
    Database, DbResult, JsonSnafu, UnknownTableSnafu, db_version, follows_followees,
    follows_followers, modes, personas, personas_by_owner, posts_anonymous,
    posts_anonymous_by_author, posts_public, posts_public_by_author, posts_seq, tables::users,
    users_by_username,
};

impl Database {
    /// Dump all records of table `name`, one JSON `key => value` line each
    ///
    /// Debugging aid only.
    pub async fn dump_table(&self, name: &str) -> DbResult<Vec<String>> {
        self.read_with(|tx| match name {
            "db_version" => Self::dump_table_dbtx(tx, &db_version::TABLE),
            "users" => Self::dump_table_dbtx(tx, &users::TABLE),
            "users_by_username" => Self::dump_table_dbtx(tx, &users_by_username::TABLE),
            "personas" => Self::dump_table_dbtx(tx, &personas::TABLE),
            "personas_by_owner" => Self::dump_table_dbtx(tx, &personas_by_owner::TABLE),
            "modes" => Self::dump_table_dbtx(tx, &modes::TABLE),
            "follows_followees" => Self::dump_table_dbtx(tx, &follows_followees::TABLE),
            "follows_followers" => Self::dump_table_dbtx(tx, &follows_followers::TABLE),
            "posts_public" => Self::dump_table_dbtx(tx, &posts_public::TABLE),
            "posts_public_by_author" => Self::dump_table_dbtx(tx, &posts_public_by_author::TABLE),
            "posts_anonymous" => Self::dump_table_dbtx(tx, &posts_anonymous::TABLE),
            "posts_anonymous_by_author" => {
                Self::dump_table_dbtx(tx, &posts_anonymous_by_author::TABLE)
            }
            "posts_seq" => Self::dump_table_dbtx(tx, &posts_seq::TABLE),
            _ => UnknownTableSnafu { name }.fail(),
        })
        .await
    }

    pub(crate) fn dump_table_dbtx<K, V>(
        dbtx: &ReadTransaction,
        def: &redb_bincode::TableDefinition<'_, K, V>,
    ) -> DbResult<Vec<String>>
    where
        V: bincode::Decode<()> + bincode::Encode + serde::Serialize,
        K: bincode::Decode<()> + bincode::Encode + serde::Serialize,
    {
        let tbl = dbtx.open_table(def)?;
        let mut ret = vec![];
        for record in tbl.range(..)? {
            let (k, v) = record?;
            ret.push(format!(
                "{} => {}",
                serde_json::to_string(&k.value()).context(JsonSnafu)?,
                serde_json::to_string(&v.value()).context(JsonSnafu)?
            ));
        }
        Ok(ret)
    }
}
