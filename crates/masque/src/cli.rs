use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use clap::{Args, Parser, Subcommand};

/// Command line options for the Masque server
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Opts {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub cmd: OptsCmd,
}

/// Global options that apply across all commands
#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Directory holding the database
    #[arg(env = "MASQUE_DATA_DIR", long)]
    pub data_dir: Option<PathBuf>,
}

static PROJECTS_DIR: LazyLock<Option<directories::ProjectDirs>> =
    LazyLock::new(|| directories::ProjectDirs::from("org", "Masque", "masque"));

impl GlobalOpts {
    /// `--data-dir` if given, otherwise the platform's state (or data) dir
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref().or_else(|| {
            PROJECTS_DIR.as_ref().map(|dirs| {
                dirs.state_dir()
                    .unwrap_or_else(|| dirs.data_local_dir())
            })
        })
    }
}

#[derive(Debug, Subcommand)]
pub enum OptsCmd {
    /// Run the HTTP API
    Serve(ServeOpts),

    /// Register a new user
    AddUser {
        #[arg(long)]
        username: String,
    },

    /// Development and debugging commands
    #[command(subcommand)]
    Dev(DevCmd),
}

#[derive(Debug, Args)]
pub struct ServeOpts {
    /// Listen address
    #[arg(long, short, default_value = "[::1]:8080", env = "MASQUE_LISTEN")]
    pub listen: String,

    /// Set SO_REUSEPORT
    #[arg(long, env = "MASQUE_REUSEPORT")]
    pub reuseport: bool,

    /// Cors origin settings
    #[arg(long, env = "MASQUE_CORS_ORIGIN")]
    pub cors_origin: Option<String>,
}

impl ServeOpts {
    pub fn to_web_opts(&self) -> masque_web::Opts {
        masque_web::Opts::new(
            self.listen.clone(),
            self.cors_origin.clone(),
            self.reuseport,
        )
    }
}

#[derive(Debug, Subcommand)]
pub enum DevCmd {
    /// Dump the content of a database table
    DbDump {
        #[arg(long)]
        table: String,
    },
}
