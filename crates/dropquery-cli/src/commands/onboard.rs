//! Onboard command implementation.

use anyhow::{Context, Result, bail};
use dropquery_core::SurveyAnswers;
use dropquery_types::format_volume;

use crate::util::Session;

pub async fn cmd_onboard(session: &Session, answers: SurveyAnswers, quiet: bool) -> Result<()> {
    if !answers.screen_time_hours.is_finite() || answers.screen_time_hours < 0.0 {
        bail!("Screen time must be a non-negative number of hours");
    }

    let baseline = answers.estimate_baseline_ml();
    let user_id = session
        .ledger
        .complete_onboarding(answers)
        .await
        .context("Failed to save onboarding answers")?;

    if !quiet {
        let unit = session.ledger.state().await.context("Failed to read ledger")?.display_unit;
        println!("Onboarding complete.");
        println!("Estimated baseline: {} per day", format_volume(baseline, unit));
        println!("Anonymous id: {}", user_id);
    }
    Ok(())
}
