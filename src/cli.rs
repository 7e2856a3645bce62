use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::listing::{SortDirection, SortKey, ViewMode};

#[derive(Debug, Parser)]
#[command(name = "filedeck", version, about = "Browse, upload and download files of a file manager server")]
pub struct Cli {
    /// Additional config file (same as FILEDECK_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Print transfer progress as JSON lines on stdout
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Target folder, either by id or by a `a/b/c` path from the root.
#[derive(Debug, Clone, Default, Args)]
pub struct FolderArgs {
    #[arg(long, conflicts_with = "path")]
    pub parent: Option<i64>,

    #[arg(long)]
    pub path: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List a folder
    Ls {
        #[command(flatten)]
        folder: FolderArgs,
        #[arg(long, value_enum)]
        sort: Option<SortKey>,
        #[arg(long, value_enum)]
        order: Option<SortDirection>,
        #[arg(long, value_enum)]
        view: Option<ViewMode>,
    },
    /// Create a folder
    Mkdir {
        name: String,
        #[command(flatten)]
        folder: FolderArgs,
    },
    /// Upload files and folders, one file at a time
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[command(flatten)]
        folder: FolderArgs,
    },
    /// Download files (folders arrive as .zip), one at a time
    Download {
        #[arg(required = true)]
        ids: Vec<i64>,
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Folder the ids live in, used to look up their names
        #[arg(long)]
        parent: Option<i64>,
    },
    /// Delete a file or folder
    Rm {
        id: i64,
        #[arg(long)]
        yes: bool,
        #[arg(long)]
        parent: Option<i64>,
    },
}
