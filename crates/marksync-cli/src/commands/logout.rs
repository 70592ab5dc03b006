//! Logout command implementation.

use anyhow::{Context, Result};

use crate::backend;
use crate::cli::Globals;
use crate::output;

pub async fn run(globals: &Globals) -> Result<()> {
    let backend = backend::connect(globals)?;

    backend
        .sessions
        .sign_out()
        .await
        .context("Failed to sign out")?;

    output::success("Signed out");
    Ok(())
}
