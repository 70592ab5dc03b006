//! Subcommand implementations.

pub mod add;
pub mod delete;
pub mod list;
pub mod login;
mod logout;
pub mod watch;
mod whoami;

use std::sync::Arc;

use anyhow::{Context, Result};

use marksync_core::{RecordStore, SyncOptions, Synchronizer};

use crate::backend::{self, Backend};
use crate::cli::{Commands, Globals};

pub async fn handle(globals: &Globals, command: Commands) -> Result<()> {
    match command {
        Commands::Login(args) => login::run(globals, args).await,
        Commands::Logout => logout::run(globals).await,
        Commands::Whoami => whoami::run(globals).await,
        Commands::Add(args) => add::run(globals, args).await,
        Commands::List(args) => list::run(globals, args).await,
        Commands::Delete(args) => delete::run(globals, args).await,
        Commands::Watch(args) => watch::run(globals, args).await,
    }
}

/// Build a synchronizer over the configured backend, seeded with the
/// current identity.
///
/// Seeding runs the initial reconcile, so a signed-in caller gets a
/// populated record list back.
async fn connect_sync(globals: &Globals) -> Result<(Backend, Arc<Synchronizer<dyn RecordStore>>)> {
    let backend = backend::connect(globals)?;

    let sync = Arc::new(Synchronizer::new(
        Arc::clone(&backend.store),
        SyncOptions::default(),
    ));

    let identity = backend
        .sessions
        .current_identity()
        .await
        .context("Failed to resolve the current identity")?;

    sync.on_identity_changed(identity)
        .await
        .context("Failed to load bookmarks")?;

    Ok((backend, sync))
}

fn not_signed_in() -> anyhow::Error {
    anyhow::anyhow!("Not signed in. Run 'marksync login <name>' first.")
}
