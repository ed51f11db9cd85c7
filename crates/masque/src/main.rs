mod cli;

use std::io;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use cli::Opts;
use masque_db::{Database, DbError};
use masque_feed::{Social, SocialError};
use masque_util_error::WhateverResult;
use masque_web::{Server, WebServerError};
use snafu::{FromString as _, OptionExt as _, ResultExt as _, Snafu, Whatever};
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

pub const LOG_TARGET: &str = "masque::cli";

#[derive(Debug, Snafu)]
pub enum CliError {
    #[snafu(display("Web server error: {source}"))]
    WebServer { source: WebServerError },
    #[snafu(display("Data dir error: {source:?}"))]
    DataDir { source: io::Error },
    #[snafu(display("Could not determine the data dir, use --data-dir"))]
    NoDataDir,
    #[snafu(display("Database error: {source}"))]
    Database { source: DbError },
    #[snafu(transparent)]
    Social { source: SocialError },
    #[snafu(display("Output serialization error: {source}"))]
    Json { source: serde_json::Error },
    #[snafu(display("Miscellaneous error: {source}"))]
    Whatever { source: Whatever },
}

pub type CliResult<T> = std::result::Result<T, CliError>;

#[snafu::report]
#[tokio::main]
async fn main() -> CliResult<()> {
    init_logging().context(WhateverSnafu)?;

    let opts = Opts::parse();
    let v = handle_cmd(opts).await?;
    println!("{}", serde_json::to_string_pretty(&v).context(JsonSnafu)?);
    Ok(())
}

async fn open_db(data_dir: Option<&Path>) -> CliResult<Database> {
    let data_dir = data_dir.context(NoDataDirSnafu)?;
    let db_path = Database::mk_db_path(data_dir)
        .await
        .context(DataDirSnafu)?;

    info!(target: LOG_TARGET, path = %db_path.display(), "Opening database");
    Database::open(db_path).await.context(DatabaseSnafu)
}

async fn handle_cmd(opts: Opts) -> CliResult<serde_json::Value> {
    Ok(match opts.cmd {
        cli::OptsCmd::Serve(ref serve_opts) => {
            let db = open_db(opts.global.data_dir()).await?;
            let server = Server::init(serve_opts.to_web_opts(), Social::new(Arc::new(db)))
                .await
                .context(WebServerSnafu)?;

            server.run().await.context(WebServerSnafu)?;

            serde_json::Value::Null
        }
        cli::OptsCmd::AddUser { ref username } => {
            let db = open_db(opts.global.data_dir()).await?;
            let user = Social::new(Arc::new(db)).register_user(username).await?;

            serde_json::to_value(user).context(JsonSnafu)?
        }
        cli::OptsCmd::Dev(cli::DevCmd::DbDump { ref table }) => {
            let db = open_db(opts.global.data_dir()).await?;

            let lines = db.dump_table(table).await.context(DatabaseSnafu)?;
            for line in lines {
                println!("{line}");
            }

            serde_json::Value::Null
        }
    })
}

pub fn init_logging() -> WhateverResult<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .try_init()
        .map_err(|_| Whatever::without_source("Failed to initialize logging".to_string()))?;

    Ok(())
}
