//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use url::Url;

use crate::commands::{add, delete, list, login, watch};

/// Bookmark synchronization from the terminal.
#[derive(Parser, Debug)]
#[command(name = "marksync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub globals: Globals,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct Globals {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Data directory for the file backend (default: platform data dir,
    /// or MARKSYNC_ROOT)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Base URL of a hosted REST backend (or MARKSYNC_STORE_URL)
    #[arg(long, global = true)]
    pub store_url: Option<Url>,

    /// API key for the hosted backend (or MARKSYNC_API_KEY)
    #[arg(long, global = true)]
    pub api_key: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in (file backend: creates the account on first use)
    Login(login::LoginArgs),

    /// Sign out the active identity
    Logout,

    /// Display the active identity
    Whoami,

    /// Add a bookmark
    Add(add::AddArgs),

    /// List bookmarks, newest first
    List(list::ListArgs),

    /// Delete a bookmark by id
    Delete(delete::DeleteArgs),

    /// Watch the bookmark list and re-render on every change
    Watch(watch::WatchArgs),
}
