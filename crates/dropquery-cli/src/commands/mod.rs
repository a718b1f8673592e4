//! Command implementations for the CLI.

mod classify;
mod config;
mod history;
mod message;
mod onboard;
mod record;
mod replay;
mod reset;
mod status;
mod unit;

pub use classify::cmd_classify;
pub use config::cmd_config;
pub use history::{HistoryArgs, cmd_history};
pub use message::{MessageArgs, cmd_message};
pub use onboard::cmd_onboard;
pub use record::cmd_record;
pub use replay::cmd_replay;
pub use reset::cmd_reset;
pub use status::cmd_status;
pub use unit::cmd_unit;
