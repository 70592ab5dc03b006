//! Watch command implementation.
//!
//! Subscribes the synchronizer to identity and change events and
//! re-renders the bookmark list whenever the revision moves. This is
//! the terminal stand-in for a reactive view: run `marksync watch` in
//! one terminal and mutate from another.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use marksync_core::{SyncDriver, SyncPhase, SyncSnapshot};

use crate::cli::Globals;
use crate::output;

use super::connect_sync;

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Output each render as a JSON line
    #[arg(long)]
    pub json: bool,
}

pub async fn run(globals: &Globals, args: WatchArgs) -> Result<()> {
    let (backend, sync) = connect_sync(globals).await?;

    let identities = backend
        .sessions
        .identity_events()
        .context("Failed to subscribe to identity events")?;
    let changes = backend
        .store
        .changes()
        .context("Failed to subscribe to the change feed")?;

    let driver = SyncDriver::spawn(Arc::clone(&sync), identities, changes);

    eprintln!("{}", "Watching for changes. Press Ctrl+C to stop.".dimmed());
    eprintln!();

    let mut updates = sync.updates();
    render(&sync.snapshot(), args.json)?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                render(&sync.snapshot(), args.json)?;
            }
        }
    }

    driver.shutdown().await;
    Ok(())
}

fn render(snapshot: &SyncSnapshot, json: bool) -> Result<()> {
    if json {
        return output::json(&snapshot.records);
    }

    let phase = match snapshot.phase {
        SyncPhase::Unauthenticated => "signed out".yellow(),
        SyncPhase::Reconciling => "syncing".cyan(),
        SyncPhase::Synced => "synced".green(),
        SyncPhase::Error => "error".red(),
    };

    println!(
        "{} {} {} {}",
        format!("#{}", snapshot.revision).dimmed(),
        phase,
        snapshot.records.len(),
        if snapshot.records.len() == 1 {
            "bookmark"
        } else {
            "bookmarks"
        }
    );

    for record in &snapshot.records {
        println!(
            "  {}  {}  {}",
            format!("[{}]", record.id).cyan(),
            record.title,
            record.target.as_str().dimmed()
        );
    }

    Ok(())
}
