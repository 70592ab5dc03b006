//! Add command implementation.

use anyhow::{Context, Result};
use clap::Args;

use marksync_core::error::Error;

use crate::cli::Globals;
use crate::output;

use super::{connect_sync, not_signed_in};

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Bookmark title
    pub title: String,

    /// Target URL
    pub url: String,
}

pub async fn run(globals: &Globals, args: AddArgs) -> Result<()> {
    let (_backend, sync) = connect_sync(globals).await?;

    let record = match sync.add_bookmark(&args.title, &args.url).await {
        Ok(record) => record,
        Err(Error::Unauthenticated) => return Err(not_signed_in()),
        Err(err) => return Err(err).context("Failed to add bookmark"),
    };

    output::success("Added bookmark");
    println!();
    output::field("Id", record.id.as_str());
    output::field("Title", &record.title);
    output::field("URL", record.target.as_str());

    Ok(())
}
