//! Persistent store of the service
//!
//! A single redb database holding the user directory, the identity linkage
//! between public users and their anonymous personas, the follow graph, mode
//! flags and the two (disjoint) post pools.
//!
//! Every operation is one read or one write transaction. Write operations
//! validate everything first and report rejections as outcomes, so a rejected
//! operation never leaves partial state behind.

mod follow;
mod identity;
mod migration_ops;
mod mode;
mod posts;
mod table_ops;
mod tables;
mod users;

use std::path::{Path, PathBuf};
use std::{io, ops, result};

use masque_util_error::BoxedError;
use redb_bincode::{ReadTransaction, WriteTransaction};
use snafu::{Location, ResultExt as _, Snafu};
use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::{debug, instrument};

pub use self::follow::{FollowEdge, FollowError, FollowResult, UnfollowError, UnfollowResult};
pub use self::identity::{AnonymousPersona, PersonaError, PersonaResult};
pub use self::mode::{SetModeError, SetModeResult};
pub use self::posts::{AnonymousPost, PostError, PostResult, PublicPost};
pub use self::tables::*;
pub use self::users::{PublicUser, RegisterUserError, RegisterUserResult};

const LOG_TARGET: &str = "masque::db";

pub struct WriteTransactionCtx {
    dbtx: WriteTransaction,
    on_commit: std::sync::Mutex<Vec<Box<dyn FnOnce() + 'static>>>,
}

impl From<WriteTransaction> for WriteTransactionCtx {
    fn from(dbtx: WriteTransaction) -> Self {
        Self {
            dbtx,
            on_commit: std::sync::Mutex::new(vec![]),
        }
    }
}

impl ops::Deref for WriteTransactionCtx {
    type Target = WriteTransaction;

    fn deref(&self) -> &Self::Target {
        &self.dbtx
    }
}

impl ops::DerefMut for WriteTransactionCtx {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.dbtx
    }
}

impl WriteTransactionCtx {
    /// Run `f` only if (and after) the transaction commits
    pub fn on_commit(&self, f: impl FnOnce() + 'static) {
        self.on_commit
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Box::new(f));
    }

    fn commit(self) -> result::Result<(), redb::CommitError> {
        let Self { dbtx, on_commit } = self;

        dbtx.commit()?;

        for hook in on_commit
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
        {
            hook();
        }
        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum DbError {
    Database {
        source: redb::DatabaseError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(transparent)]
    Table {
        source: redb::TableError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(transparent)]
    Storage {
        source: redb::StorageError,
        #[snafu(implicit)]
        location: Location,
    },
    Transaction {
        source: redb::TransactionError,
        #[snafu(implicit)]
        location: Location,
    },
    Commit {
        source: redb::CommitError,
        #[snafu(implicit)]
        location: Location,
    },
    DbVersionTooHigh {
        db_ver: u64,
        code_ver: u64,
        #[snafu(implicit)]
        location: Location,
    },
    Join {
        source: JoinError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("Unknown table: {name}"))]
    UnknownTable {
        name: String,
    },
    Json {
        source: serde_json::Error,
    },
    #[snafu(transparent)]
    DbTxLogic {
        source: BoxedError,
        #[snafu(implicit)]
        location: Location,
    },
}
pub type DbResult<T> = std::result::Result<T, DbError>;

#[derive(Debug)]
pub struct Database {
    inner: redb_bincode::Database,

    /// Bumped after every committed write
    data_version: watch::Sender<u64>,
}

impl Database {
    pub const DB_FILE_NAME: &str = "masque.redb";

    pub async fn mk_db_path(data_dir: &Path) -> std::result::Result<PathBuf, io::Error> {
        tokio::fs::create_dir_all(&data_dir).await?;
        Ok(data_dir.join(Self::DB_FILE_NAME))
    }

    #[instrument(skip_all)]
    pub async fn open(path: impl Into<PathBuf>) -> DbResult<Database> {
        let path = path.into();
        debug!(target: LOG_TARGET, path = %path.display(), "Opening database");
        let inner = tokio::task::spawn_blocking(move || redb_bincode::Database::create(path))
            .await
            .context(JoinSnafu)?
            .context(DatabaseSnafu)?;

        Self::write_with_inner(&inner, |tx| {
            Self::init_tables_tx(tx)?;
            Self::handle_db_ver_migrations(tx)?;
            Ok(())
        })
        .await?;

        let (data_version, _) = watch::channel(0);

        Ok(Self {
            inner,
            data_version,
        })
    }

    /// Current data version
    ///
    /// Any two reads done under the same data version observe the same data.
    pub fn data_version(&self) -> u64 {
        *self.data_version.borrow()
    }

    /// Mark the transaction as one changing the data
    pub(crate) fn notify_data_changed_tx(&self, tx: &WriteTransactionCtx) {
        let sender = self.data_version.clone();
        tx.on_commit(move || {
            sender.send_modify(|v| *v = v.wrapping_add(1));
        });
    }
}

impl Database {
    pub async fn write_with_inner<T>(
        inner: &redb_bincode::Database,
        f: impl FnOnce(&'_ WriteTransactionCtx) -> DbResult<T>,
    ) -> DbResult<T> {
        tokio::task::block_in_place(|| {
            let mut dbtx =
                WriteTransactionCtx::from(inner.begin_write().context(TransactionSnafu)?);
            let res = f(&mut dbtx)?;

            dbtx.commit().context(CommitSnafu)?;

            Ok(res)
        })
    }

    pub async fn write_with<T>(
        &self,
        f: impl FnOnce(&'_ WriteTransactionCtx) -> DbResult<T>,
    ) -> DbResult<T> {
        Self::write_with_inner(&self.inner, f).await
    }

    pub async fn read_with_inner<T>(
        inner: &redb_bincode::Database,
        f: impl FnOnce(&'_ ReadTransaction) -> DbResult<T>,
    ) -> DbResult<T> {
        tokio::task::block_in_place(|| {
            let mut dbtx = inner.begin_read().context(TransactionSnafu)?;

            f(&mut dbtx)
        })
    }

    pub async fn read_with<T>(
        &self,
        f: impl FnOnce(&'_ ReadTransaction) -> DbResult<T>,
    ) -> DbResult<T> {
        Self::read_with_inner(&self.inner, f).await
    }
}

#[cfg(test)]
mod tests;
