//! Platform-agnostic types and heuristics for DropQuery.
//!
//! DropQuery estimates the water attributed to AI chatbot queries. This crate
//! holds everything that needs neither I/O nor an async runtime, so it can be
//! shared by the native core (dropquery-core) and the WebAssembly bindings
//! (dropquery-wasm).
//!
//! # Features
//!
//! - Volume conversion and display formatting ([`units`])
//! - Model tags and the per-model volume table ([`model`])
//! - Known AI endpoints and URL classification ([`endpoints`])
//! - The lexical prompt heuristic ([`lexical`])
//! - The throttle/dedup gate ([`throttle`])
//! - The persisted ledger data model ([`ledger`])
//!
//! # Example
//!
//! ```
//! use dropquery_types::{DisplayUnit, ModelTag, VolumeEstimates, format_volume};
//!
//! let ml = VolumeEstimates::default().estimate(ModelTag::ChatGpt);
//! assert_eq!(format_volume(ml, DisplayUnit::Milliliters), "0.322 ml");
//! ```

pub mod endpoints;
pub mod error;
pub mod ledger;
pub mod lexical;
pub mod model;
pub mod throttle;
pub mod units;

pub use error::{ParseError, ParseResult};
pub use ledger::{AppFlags, DailyTotal, LedgerState, LedgerSummary, UsageRecord};
pub use model::{ModelTag, VolumeEstimates, is_valid_volume};
pub use throttle::ThrottleGate;
pub use units::{
    DisplayUnit, DisplayVolume, VolumeLabel, convert, format_volume, from_display, to_display,
};
