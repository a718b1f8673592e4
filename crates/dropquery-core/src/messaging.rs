//! Impact messages derived from ledger state.
//!
//! [`MessageGenerator::message`] compares today's usage with the rolling
//! average and picks a [`Tone`]. Surpluses and deficits are expressed in
//! "days of drinking water" for villages, children, shelters, adults, dogs
//! and cats, using the first tier whose floored count is non-zero. Text is
//! drawn uniformly from a small pool per tier; inject a seeded RNG for
//! deterministic output.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand::rngs::ThreadRng;
use serde::{Deserialize, Serialize};
use time::{Date, Duration};

use dropquery_types::{DisplayUnit, format_volume};

use crate::error::{Error, Result};

/// Usage at or below this fraction of the average counts as a surplus.
pub const POSITIVE_RATIO: f64 = 0.85;

/// Daily water needs used for comparisons, in ml/day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EquivalenceConstants {
    /// 40 fl oz.
    pub child_ml: f64,
    pub adult_ml: f64,
    /// 50 lb at 1 fl oz/lb.
    pub dog_ml: f64,
    /// 10 lb at 0.8 fl oz/lb.
    pub cat_ml: f64,
    pub shelter_ml: f64,
    pub village_ml: f64,
}

impl Default for EquivalenceConstants {
    fn default() -> Self {
        Self {
            child_ml: 1182.94,
            adult_ml: 3200.0,
            dog_ml: 1478.675,
            cat_ml: 236.588,
            shelter_ml: 50_000.0,
            village_ml: 500_000.0,
        }
    }
}

impl EquivalenceConstants {
    /// Every constant must be finite and positive.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("child_ml", self.child_ml),
            ("adult_ml", self.adult_ml),
            ("dog_ml", self.dog_ml),
            ("cat_ml", self.cat_ml),
            ("shelter_ml", self.shelter_ml),
            ("village_ml", self.village_ml),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Overall sentiment of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    /// Nothing tracked yet.
    Neutral,
    /// Usage but no average to compare with.
    Educational,
    /// Comfortably under the average.
    Positive,
    /// Under the average but close to it.
    Caution,
    /// Over the average.
    Negative,
    /// Exactly at the average.
    OnTrack,
}

impl Tone {
    /// Classify `daily_ml` against `average_ml`.
    pub fn classify(daily_ml: f64, average_ml: f64) -> Self {
        if !(average_ml > 0.0) {
            return if daily_ml > 0.0 {
                Tone::Educational
            } else {
                Tone::Neutral
            };
        }
        let difference = average_ml - daily_ml;
        let ratio = daily_ml / average_ml;
        if difference > 0.0 && ratio <= POSITIVE_RATIO {
            Tone::Positive
        } else if difference > 0.0 {
            Tone::Caution
        } else if difference < 0.0 {
            Tone::Negative
        } else {
            Tone::OnTrack
        }
    }
}

/// A rendered message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactMessage {
    pub tone: Tone,
    pub text: String,
}

/// Equivalence tier for a surplus or deficit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Villages,
    ManyChildren,
    Children,
    Shelters,
    Adults,
    Dogs,
    Cats,
    Generic,
}

impl Tier {
    /// First tier with a non-zero floored count, and that count.
    pub fn for_amount(amount_ml: f64, constants: &EquivalenceConstants) -> (Tier, u64) {
        let count = |need: f64| (amount_ml / need).floor().max(0.0) as u64;
        let villages = count(constants.village_ml);
        let children = count(constants.child_ml);
        let shelters = count(constants.shelter_ml);
        let adults = count(constants.adult_ml);
        let dogs = count(constants.dog_ml);
        let cats = count(constants.cat_ml);

        if villages > 0 {
            (Tier::Villages, villages)
        } else if children >= 3 {
            (Tier::ManyChildren, children)
        } else if children > 0 {
            (Tier::Children, children)
        } else if shelters > 0 {
            (Tier::Shelters, shelters)
        } else if adults > 0 {
            (Tier::Adults, adults)
        } else if dogs > 0 {
            (Tier::Dogs, dogs)
        } else if cats > 0 {
            (Tier::Cats, cats)
        } else {
            (Tier::Generic, 0)
        }
    }

    fn noun(self, count: u64) -> &'static str {
        let one = count == 1;
        match self {
            Tier::Villages => pick(one, "small village", "small villages"),
            Tier::ManyChildren | Tier::Children => pick(one, "child", "children"),
            Tier::Shelters => pick(one, "animal shelter", "animal shelters"),
            Tier::Adults => pick(one, "adult", "adults"),
            Tier::Dogs => pick(one, "dog", "dogs"),
            Tier::Cats => pick(one, "cat", "cats"),
            Tier::Generic => "",
        }
    }

    fn surplus_pool(self) -> &'static [&'static str] {
        match self {
            Tier::Villages => &[
                "{pct}% under your estimate today. That water could supply {count} {noun}.",
                "Staying {pct}% below estimate left enough for {count} {noun}.",
            ],
            Tier::ManyChildren => &[
                "{pct}% below estimate: {count} children could drink for a day on what you saved.",
                "You saved a full day of water for {count} children.",
            ],
            Tier::Children => &[
                "{pct}% under budget, a day of drinking water for {count} {noun}.",
                "What you saved today covers {count} {noun} for a day.",
            ],
            Tier::Shelters => &[
                "{pct}% below estimate keeps {count} {noun} supplied for a day.",
                "Your savings today could run {count} {noun}.",
            ],
            Tier::Adults => &[
                "{pct}% below estimate, enough for {count} {noun}.",
                "{count} {noun} could drink for a day on the water you saved.",
            ],
            Tier::Dogs => &[
                "Careful prompting saved a day of water for {count} {noun}.",
                "{pct}% under budget keeps {count} {noun} hydrated.",
            ],
            Tier::Cats => &[
                "{pct}% below estimate, enough for {count} {noun}.",
                "{count} {noun} could drink today thanks to your restraint.",
            ],
            Tier::Generic => &[
                "{pct}% below today's estimate. Nice work.",
                "Careful AI use put you {pct}% under budget today.",
            ],
        }
    }

    fn deficit_pool(self) -> &'static [&'static str] {
        match self {
            Tier::Villages => &[
                "{pct}% above your estimate. The extra could have supplied {count} {noun}.",
                "Today's overshoot matches what {count} {noun} need in a day.",
            ],
            Tier::ManyChildren => &[
                "{pct}% above estimate: the extra could have hydrated {count} children.",
                "Your extra prompts used a day of water for {count} children.",
            ],
            Tier::Children => &[
                "{pct}% over budget, a day of drinking water for {count} {noun}.",
                "The overshoot today equals what {count} {noun} should drink daily.",
            ],
            Tier::Shelters => &[
                "{pct}% above estimate, water that could keep {count} {noun} running.",
                "Today's extra usage matches {count} {noun} for a day.",
            ],
            Tier::Adults => &[
                "{pct}% over estimate, enough for {count} {noun}.",
                "{count} {noun} could have had a day of water from today's overshoot.",
            ],
            Tier::Dogs => &[
                "{pct}% over budget, a day of water for {count} {noun}.",
                "Today's extra prompts match what {count} {noun} drink in a day.",
            ],
            Tier::Cats => &[
                "{pct}% above estimate, enough for {count} {noun}.",
                "The overshoot could have filled {count} {noun}' bowls today.",
            ],
            Tier::Generic => &[
                "{pct}% above today's estimate. Easing off helps.",
                "Slightly over budget today ({pct}% above).",
            ],
        }
    }
}

fn pick(one: bool, singular: &'static str, plural: &'static str) -> &'static str {
    if one { singular } else { plural }
}

const CAUTION_POOL: &[&str] = &[
    "You're at {ratio}% of today's estimate ({estimate}).",
    "Only {remaining} left before you reach today's estimate, a day of water for {count} {noun}.",
    "Almost at your estimate of {estimate}. Easing off now keeps you under.",
];

fn render(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter()
        .fold(template.to_string(), |text, (key, value)| {
            text.replace(key, value)
        })
}

/// Picks impact messages.
pub struct MessageGenerator<R = ThreadRng> {
    constants: EquivalenceConstants,
    rng: R,
}

impl MessageGenerator<ThreadRng> {
    /// Generator drawing from the thread RNG.
    pub fn new(constants: EquivalenceConstants) -> Self {
        Self {
            constants,
            rng: rand::rng(),
        }
    }
}

impl<R: Rng> MessageGenerator<R> {
    /// Generator drawing from `rng`.
    pub fn with_rng(constants: EquivalenceConstants, rng: R) -> Self {
        Self { constants, rng }
    }

    pub fn constants(&self) -> &EquivalenceConstants {
        &self.constants
    }

    fn choose(&mut self, pool: &'static [&'static str]) -> &'static str {
        pool[self.rng.random_range(0..pool.len())]
    }

    /// Message for `daily_ml` against `average_ml`, amounts shown in `unit`.
    pub fn message(&mut self, daily_ml: f64, average_ml: f64, unit: DisplayUnit) -> ImpactMessage {
        let tone = Tone::classify(daily_ml, average_ml);
        let text = match tone {
            Tone::Neutral => "Track your first query to see your impact.".to_string(),
            Tone::Educational => self.educational(daily_ml, unit),
            Tone::Positive => {
                let surplus = average_ml - daily_ml;
                let pct = format!("{:.1}", surplus / average_ml * 100.0);
                let (tier, count) = Tier::for_amount(surplus, &self.constants);
                let template = self.choose(tier.surplus_pool());
                render(
                    template,
                    &[
                        ("{pct}", &pct),
                        ("{count}", &count.to_string()),
                        ("{noun}", tier.noun(count)),
                    ],
                )
            }
            Tone::Caution => {
                let remaining = (average_ml - daily_ml).max(0.0);
                let children = ((remaining / self.constants.child_ml).ceil() as u64).max(1);
                let ratio = format!("{}", (daily_ml / average_ml * 100.0).round());
                let template = self.choose(CAUTION_POOL);
                render(
                    template,
                    &[
                        ("{ratio}", &ratio),
                        ("{estimate}", &format_volume(average_ml, unit)),
                        ("{remaining}", &format_volume(remaining, unit)),
                        ("{count}", &children.to_string()),
                        ("{noun}", Tier::Children.noun(children)),
                    ],
                )
            }
            Tone::Negative => {
                let excess = daily_ml - average_ml;
                let pct = format!("{:.1}", excess / average_ml * 100.0);
                let (tier, count) = Tier::for_amount(excess, &self.constants);
                let template = self.choose(tier.deficit_pool());
                render(
                    template,
                    &[
                        ("{pct}", &pct),
                        ("{count}", &count.to_string()),
                        ("{noun}", tier.noun(count)),
                    ],
                )
            }
            Tone::OnTrack => format!(
                "Right on your estimate of {} today.",
                format_volume(average_ml, unit)
            ),
        };
        ImpactMessage { tone, text }
    }

    fn educational(&self, daily_ml: f64, unit: DisplayUnit) -> String {
        let c = &self.constants;
        let amount = format_volume(daily_ml, unit);
        let count = |need: f64| (daily_ml / need).floor() as u64;
        let candidates = [
            (Tier::Cats, count(c.cat_ml)),
            (Tier::Children, count(c.child_ml)),
            (Tier::Adults, count(c.adult_ml)),
            (Tier::Dogs, count(c.dog_ml)),
        ];
        match candidates.iter().find(|(_, n)| *n >= 1) {
            Some((tier, n)) => format!(
                "Your {amount} today could give {n} {} a day of drinking water.",
                tier.noun(*n)
            ),
            None => format!(
                "Your {amount} today is {:.2} of a cat's daily water need.",
                daily_ml / c.cat_ml
            ),
        }
    }
}

/// How often the usage summary is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryFrequency {
    #[default]
    Daily,
    Weekly,
    Yearly,
}

impl SummaryFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryFrequency::Daily => "daily",
            SummaryFrequency::Weekly => "weekly",
            SummaryFrequency::Yearly => "yearly",
        }
    }

    /// Whether a summary is due, given the date one was last shown.
    pub fn is_due(&self, last_shown: Option<Date>, today: Date) -> bool {
        let Some(last) = last_shown else {
            return true;
        };
        match self {
            SummaryFrequency::Daily => last != today,
            SummaryFrequency::Weekly => last < today - Duration::days(7),
            SummaryFrequency::Yearly => last < today - Duration::days(365),
        }
    }
}

impl fmt::Display for SummaryFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryFrequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(SummaryFrequency::Daily),
            "weekly" => Ok(SummaryFrequency::Weekly),
            "yearly" => Ok(SummaryFrequency::Yearly),
            other => Err(Error::InvalidConfig(format!(
                "unknown summary frequency: {other}"
            ))),
        }
    }
}

/// Ledger figures a summary is built from, all in ml.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SummaryFigures {
    pub daily_ml: f64,
    pub weekly_ml: f64,
    pub total_ml: f64,
    pub average_ml: f64,
}

/// Body text of the periodic usage summary.
pub fn summary_text(
    frequency: SummaryFrequency,
    figures: SummaryFigures,
    unit: DisplayUnit,
    constants: &EquivalenceConstants,
) -> String {
    let SummaryFigures {
        daily_ml,
        weekly_ml,
        total_ml,
        average_ml,
    } = figures;
    match frequency {
        SummaryFrequency::Daily => {
            let difference = average_ml - daily_ml;
            if difference > 0.0 {
                let children = (difference / constants.child_ml).floor() as u64;
                format!(
                    "You saved water for {children} {} today. Total: {}",
                    pick(children == 1, "child", "children"),
                    format_volume(daily_ml, unit)
                )
            } else {
                format!(
                    "Your usage today: {}. {} above average.",
                    format_volume(daily_ml, unit),
                    format_volume(difference.abs(), unit)
                )
            }
        }
        SummaryFrequency::Weekly => format!(
            "Weekly usage: {}. Saved against your average: {}",
            format_volume(weekly_ml, unit),
            format_volume((average_ml * 7.0 - weekly_ml).max(0.0), unit)
        ),
        SummaryFrequency::Yearly => format!(
            "Lifetime usage: {}. Keep tracking your water impact.",
            format_volume(total_ml, unit)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use time::macros::date;

    fn generator() -> MessageGenerator<StdRng> {
        MessageGenerator::with_rng(EquivalenceConstants::default(), StdRng::seed_from_u64(7))
    }

    #[test]
    fn test_tone_classification() {
        assert_eq!(Tone::classify(0.0, 0.0), Tone::Neutral);
        assert_eq!(Tone::classify(5.0, 0.0), Tone::Educational);
        assert_eq!(Tone::classify(8.5, 10.0), Tone::Positive);
        assert_eq!(Tone::classify(9.0, 10.0), Tone::Caution);
        assert_eq!(Tone::classify(11.0, 10.0), Tone::Negative);
        assert_eq!(Tone::classify(10.0, 10.0), Tone::OnTrack);
        assert_eq!(Tone::classify(1.0, f64::NAN), Tone::Educational);
    }

    #[test]
    fn test_tier_order() {
        let c = EquivalenceConstants::default();
        assert_eq!(Tier::for_amount(600_000.0, &c), (Tier::Villages, 1));
        assert_eq!(Tier::for_amount(3600.0, &c), (Tier::ManyChildren, 3));
        assert_eq!(Tier::for_amount(1200.0, &c), (Tier::Children, 1));
        assert_eq!(Tier::for_amount(500.0, &c), (Tier::Cats, 2));
        assert_eq!(Tier::for_amount(100.0, &c), (Tier::Generic, 0));
    }

    #[test]
    fn test_first_query_prompt() {
        let msg = generator().message(0.0, 0.0, DisplayUnit::Milliliters);
        assert_eq!(msg.tone, Tone::Neutral);
        assert!(msg.text.contains("first query"));
    }

    #[test]
    fn test_educational_prefers_cats() {
        let msg = generator().message(500.0, 0.0, DisplayUnit::Milliliters);
        assert_eq!(msg.tone, Tone::Educational);
        assert_eq!(
            msg.text,
            "Your 500 ml today could give 2 cats a day of drinking water."
        );
    }

    #[test]
    fn test_educational_fraction_of_cat() {
        let msg = generator().message(23.6588, 0.0, DisplayUnit::Milliliters);
        assert!(msg.text.contains("0.10 of a cat's"), "{}", msg.text);
    }

    #[test]
    fn test_positive_message_mentions_percent() {
        let msg = generator().message(10.0, 100.0, DisplayUnit::Milliliters);
        assert_eq!(msg.tone, Tone::Positive);
        assert!(msg.text.contains("90.0%"), "{}", msg.text);
    }

    #[test]
    fn test_positive_children_tier_text() {
        let mut generator = generator();
        for _ in 0..10 {
            let msg = generator.message(0.5, 4000.0, DisplayUnit::Milliliters);
            assert!(msg.text.contains('3'), "{}", msg.text);
            assert!(msg.text.contains("children"), "{}", msg.text);
        }
    }

    #[test]
    fn test_caution_message() {
        let mut generator = generator();
        for _ in 0..10 {
            let msg = generator.message(90.0, 100.0, DisplayUnit::Milliliters);
            assert_eq!(msg.tone, Tone::Caution);
            assert!(
                msg.text.contains("90%") || msg.text.contains("100 ml") || msg.text.contains("10 ml"),
                "{}",
                msg.text
            );
        }
    }

    #[test]
    fn test_negative_message() {
        let msg = generator().message(150.0, 100.0, DisplayUnit::Milliliters);
        assert_eq!(msg.tone, Tone::Negative);
        assert!(msg.text.contains("50.0%"), "{}", msg.text);
    }

    #[test]
    fn test_on_track_message() {
        let msg = generator().message(20.0, 20.0, DisplayUnit::Milliliters);
        assert_eq!(msg.tone, Tone::OnTrack);
        assert_eq!(msg.text, "Right on your estimate of 20 ml today.");
    }

    #[test]
    fn test_same_seed_same_text() {
        let a = generator().message(10.0, 100.0, DisplayUnit::Milliliters);
        let b = generator().message(10.0, 100.0, DisplayUnit::Milliliters);
        assert_eq!(a, b);
    }

    #[test]
    fn test_constants_validation() {
        assert!(EquivalenceConstants::default().validate().is_ok());
        let bad = EquivalenceConstants {
            dog_ml: 0.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_summary_due() {
        let today = date!(2024 - 01 - 15);
        assert!(SummaryFrequency::Daily.is_due(None, today));
        assert!(!SummaryFrequency::Daily.is_due(Some(today), today));
        assert!(SummaryFrequency::Daily.is_due(Some(date!(2024 - 01 - 14)), today));
        assert!(!SummaryFrequency::Weekly.is_due(Some(date!(2024 - 01 - 08)), today));
        assert!(SummaryFrequency::Weekly.is_due(Some(date!(2024 - 01 - 07)), today));
        assert!(!SummaryFrequency::Yearly.is_due(Some(date!(2023 - 06 - 01)), today));
        assert!(SummaryFrequency::Yearly.is_due(Some(date!(2023 - 01 - 01)), today));
    }

    #[test]
    fn test_summary_text() {
        let c = EquivalenceConstants::default();
        let figures = SummaryFigures {
            daily_ml: 100.0,
            weekly_ml: 500.0,
            total_ml: 2500.0,
            average_ml: 2500.0,
        };
        let unit = DisplayUnit::Milliliters;
        assert_eq!(
            summary_text(SummaryFrequency::Daily, figures, unit, &c),
            "You saved water for 2 children today. Total: 100 ml"
        );
        assert_eq!(
            summary_text(SummaryFrequency::Weekly, figures, unit, &c),
            "Weekly usage: 500 ml. Saved against your average: 17 L"
        );
        assert!(summary_text(SummaryFrequency::Yearly, figures, unit, &c).contains("2.5 L"));

        let over = SummaryFigures {
            daily_ml: 30.0,
            average_ml: 20.0,
            ..figures
        };
        assert_eq!(
            summary_text(SummaryFrequency::Daily, over, unit, &c),
            "Your usage today: 30 ml. 10 ml above average."
        );
    }

    #[test]
    fn test_frequency_parse() {
        assert_eq!("Weekly".parse::<SummaryFrequency>().unwrap(), SummaryFrequency::Weekly);
        assert!("hourly".parse::<SummaryFrequency>().is_err());
    }
}
