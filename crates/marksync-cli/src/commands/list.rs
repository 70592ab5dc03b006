//! List command implementation.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use marksync_core::SyncPhase;

use crate::cli::Globals;
use crate::output;

use super::{connect_sync, not_signed_in};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output the records as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(globals: &Globals, args: ListArgs) -> Result<()> {
    let (_backend, sync) = connect_sync(globals).await?;

    let snapshot = sync.snapshot();
    if snapshot.phase == SyncPhase::Unauthenticated {
        return Err(not_signed_in());
    }

    if args.json {
        return output::json(&snapshot.records);
    }

    if snapshot.records.is_empty() {
        eprintln!("{}", "No bookmarks.".dimmed());
        return Ok(());
    }

    for record in &snapshot.records {
        println!(
            "{}  {}",
            format!("[{}]", record.id).cyan(),
            record.title.bold()
        );
        println!("     {}", record.target.as_str().dimmed());
    }

    Ok(())
}
