//! Login command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::backend;
use crate::cli::Globals;
use crate::output;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account name to sign in as
    pub name: String,
}

pub async fn run(globals: &Globals, args: LoginArgs) -> Result<()> {
    let backend = backend::connect(globals)?;

    eprintln!("{}", "Signing in...".dimmed());

    let identity = backend
        .sessions
        .sign_in(&args.name)
        .await
        .context("Failed to sign in")?;

    output::success("Signed in");
    println!();
    output::field("Owner", identity.id().as_str());
    if let Some(name) = identity.display_name() {
        output::field("Name", name);
    }

    Ok(())
}
