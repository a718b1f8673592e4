//! Unit command implementation.

use anyhow::{Context, Result};
use dropquery_types::DisplayUnit;

use crate::util::Session;

pub async fn cmd_unit(session: &Session, unit: Option<DisplayUnit>, next: bool) -> Result<()> {
    let current = session
        .ledger
        .state()
        .await
        .context("Failed to read ledger")?
        .display_unit;

    let wanted = match (unit, next) {
        (Some(unit), _) => unit,
        (None, true) => current.next(),
        (None, false) => {
            println!("{}", current);
            return Ok(());
        }
    };

    session
        .ledger
        .set_display_unit(wanted)
        .await
        .context("Failed to change display unit")?;
    println!("{}", wanted);
    Ok(())
}
