//! Volume unit conversion and display formatting.
//!
//! All volumes are accounted in milliliters. Conversion to a display unit is
//! a presentation concern applied at read time.
//!
//! # Example
//!
//! ```
//! use dropquery_types::{DisplayUnit, VolumeLabel, to_display};
//!
//! let shown = to_display(1500.0, DisplayUnit::Milliliters);
//! assert_eq!(shown.value, 1.5);
//! assert_eq!(shown.label, VolumeLabel::Liters);
//! assert_eq!(shown.to_string(), "1.5 L");
//! ```

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Milliliters in one US gallon.
pub const ML_PER_GALLON: f64 = 3785.41;
/// Milliliters in one US fluid ounce.
pub const ML_PER_OUNCE: f64 = 29.5735;
/// Milliliters in one liter.
pub const ML_PER_LITER: f64 = 1000.0;
/// Milliliters in one cubic meter.
pub const ML_PER_CUBIC_METER: f64 = 1_000_000.0;

/// User-selected display unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DisplayUnit {
    /// Metric (ml, scaling up to L and m³).
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "ml"))]
    Milliliters,
    /// US gallons.
    Gallons,
    /// US fluid ounces.
    Ounces,
}

impl DisplayUnit {
    /// All units in toggle order.
    pub const ALL: [DisplayUnit; 3] = [
        DisplayUnit::Milliliters,
        DisplayUnit::Gallons,
        DisplayUnit::Ounces,
    ];

    /// Stored name of the unit (`ml`, `gallons`, `ounces`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayUnit::Milliliters => "ml",
            DisplayUnit::Gallons => "gallons",
            DisplayUnit::Ounces => "ounces",
        }
    }

    /// The unit that follows this one when cycling through units.
    ///
    /// ```
    /// use dropquery_types::DisplayUnit;
    ///
    /// assert_eq!(DisplayUnit::Milliliters.next(), DisplayUnit::Gallons);
    /// assert_eq!(DisplayUnit::Ounces.next(), DisplayUnit::Milliliters);
    /// ```
    #[must_use]
    pub fn next(&self) -> Self {
        match self {
            DisplayUnit::Milliliters => DisplayUnit::Gallons,
            DisplayUnit::Gallons => DisplayUnit::Ounces,
            DisplayUnit::Ounces => DisplayUnit::Milliliters,
        }
    }
}

impl fmt::Display for DisplayUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayUnit {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ml" | "milliliters" | "millilitres" | "metric" => Ok(DisplayUnit::Milliliters),
            "gal" | "gallon" | "gallons" => Ok(DisplayUnit::Gallons),
            "oz" | "ounce" | "ounces" => Ok(DisplayUnit::Ounces),
            _ => Err(ParseError::UnknownUnit(s.to_string())),
        }
    }
}

/// Label attached to a displayed volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VolumeLabel {
    Milliliters,
    Liters,
    CubicMeters,
    Gallons,
    Ounces,
}

impl VolumeLabel {
    /// Short symbol shown next to the value.
    #[must_use]
    pub fn symbol(&self) -> &'static str {
        match self {
            VolumeLabel::Milliliters => "ml",
            VolumeLabel::Liters => "L",
            VolumeLabel::CubicMeters => "m³",
            VolumeLabel::Gallons => "gal",
            VolumeLabel::Ounces => "oz",
        }
    }

    /// How many milliliters one unit of this label represents.
    #[must_use]
    pub fn ml_factor(&self) -> f64 {
        match self {
            VolumeLabel::Milliliters => 1.0,
            VolumeLabel::Liters => ML_PER_LITER,
            VolumeLabel::CubicMeters => ML_PER_CUBIC_METER,
            VolumeLabel::Gallons => ML_PER_GALLON,
            VolumeLabel::Ounces => ML_PER_OUNCE,
        }
    }
}

impl fmt::Display for VolumeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for VolumeLabel {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ml" => Ok(VolumeLabel::Milliliters),
            "L" | "l" => Ok(VolumeLabel::Liters),
            "m³" | "m3" => Ok(VolumeLabel::CubicMeters),
            "gal" => Ok(VolumeLabel::Gallons),
            "oz" => Ok(VolumeLabel::Ounces),
            _ => Err(ParseError::UnknownLabel(s.to_string())),
        }
    }
}

/// A volume ready for display: a rounded number and its label.
///
/// `Display` renders `"<value> <label>"` with trailing zeros stripped,
/// e.g. `"0.322 ml"`, `"1.5 L"`, `"1 gal"`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisplayVolume {
    /// Rounded numeric value in `label` units.
    pub value: f64,
    /// Label for `value`.
    pub label: VolumeLabel,
}

impl DisplayVolume {
    /// Convert back to canonical milliliters.
    #[must_use]
    pub fn to_ml(&self) -> f64 {
        from_display(self.value, self.label)
    }
}

impl fmt::Display for DisplayVolume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Normalise -0.0 so rounding tiny negatives never prints "-0".
        let value = if self.value == 0.0 { 0.0 } else { self.value };
        write!(f, "{} {}", value, self.label.symbol())
    }
}

/// Convert milliliters to the raw (unrounded) amount in `unit`.
///
/// For [`DisplayUnit::Milliliters`] this is the identity; the L/m³ scaling
/// only happens in [`to_display`].
#[must_use]
pub fn convert(volume_ml: f64, unit: DisplayUnit) -> f64 {
    match unit {
        DisplayUnit::Milliliters => volume_ml,
        DisplayUnit::Gallons => volume_ml / ML_PER_GALLON,
        DisplayUnit::Ounces => volume_ml / ML_PER_OUNCE,
    }
}

/// Format a canonical volume for display in the chosen unit.
///
/// - Metric: below 1000 ml shows ml, below 1 000 000 ml shows liters,
///   otherwise cubic meters; always 4 decimal places before trimming.
/// - Gallons/ounces: 4 decimals below 1, 3 below 10, otherwise 2.
///
/// ```
/// use dropquery_types::{DisplayUnit, VolumeLabel, to_display};
///
/// let gal = to_display(3785.41, DisplayUnit::Gallons);
/// assert_eq!((gal.value, gal.label), (1.0, VolumeLabel::Gallons));
///
/// let ml = to_display(500.0, DisplayUnit::Milliliters);
/// assert_eq!((ml.value, ml.label), (500.0, VolumeLabel::Milliliters));
/// ```
#[must_use]
pub fn to_display(volume_ml: f64, unit: DisplayUnit) -> DisplayVolume {
    match unit {
        DisplayUnit::Milliliters => {
            if volume_ml < ML_PER_LITER {
                DisplayVolume {
                    value: round_to(volume_ml, 4),
                    label: VolumeLabel::Milliliters,
                }
            } else if volume_ml < ML_PER_CUBIC_METER {
                DisplayVolume {
                    value: round_to(volume_ml / ML_PER_LITER, 4),
                    label: VolumeLabel::Liters,
                }
            } else {
                DisplayVolume {
                    value: round_to(volume_ml / ML_PER_CUBIC_METER, 4),
                    label: VolumeLabel::CubicMeters,
                }
            }
        }
        DisplayUnit::Gallons | DisplayUnit::Ounces => {
            let converted = convert(volume_ml, unit);
            let decimals = if converted < 1.0 {
                4
            } else if converted < 10.0 {
                3
            } else {
                2
            };
            let label = if unit == DisplayUnit::Gallons {
                VolumeLabel::Gallons
            } else {
                VolumeLabel::Ounces
            };
            DisplayVolume {
                value: round_to(converted, decimals),
                label,
            }
        }
    }
}

/// Inverse of [`to_display`]: turn a displayed value back into milliliters.
#[must_use]
pub fn from_display(value: f64, label: VolumeLabel) -> f64 {
    value * label.ml_factor()
}

/// Format a volume straight to text, e.g. `"2.5 L"`.
#[must_use]
pub fn format_volume(volume_ml: f64, unit: DisplayUnit) -> String {
    to_display(volume_ml, unit).to_string()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
