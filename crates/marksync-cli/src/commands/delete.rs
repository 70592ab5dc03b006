//! Delete command implementation.

use anyhow::{Context, Result};
use clap::Args;

use marksync_core::RecordId;

use crate::cli::Globals;
use crate::output;

use super::connect_sync;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Id of the bookmark to delete
    pub id: String,
}

pub async fn run(globals: &Globals, args: DeleteArgs) -> Result<()> {
    let id = RecordId::new(&args.id).context("Invalid bookmark id")?;

    let (_backend, sync) = connect_sync(globals).await?;

    sync.delete_bookmark(&id)
        .await
        .context("Failed to delete bookmark")?;

    output::success("Deleted bookmark");
    Ok(())
}
