//! Reset command implementation.

use anyhow::{Context, Result, bail};

use crate::util::Session;

pub async fn cmd_reset(session: &Session, yes: bool, quiet: bool) -> Result<()> {
    if !yes {
        bail!("Reset erases all usage data and the onboarding survey. Re-run with --yes to confirm");
    }
    session.ledger.reset().await.context("Failed to reset ledger")?;
    if !quiet {
        println!("All usage data erased.");
    }
    Ok(())
}
