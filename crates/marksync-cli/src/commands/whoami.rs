//! Whoami command implementation.

use anyhow::{Context, Result};

use crate::backend;
use crate::cli::Globals;
use crate::output;

use super::not_signed_in;

pub async fn run(globals: &Globals) -> Result<()> {
    let backend = backend::connect(globals)?;

    let identity = backend
        .sessions
        .current_identity()
        .await
        .context("Failed to resolve the current identity")?
        .ok_or_else(not_signed_in)?;

    output::field("Owner", identity.id().as_str());
    if let Some(name) = identity.display_name() {
        output::field("Name", name);
    }

    Ok(())
}
