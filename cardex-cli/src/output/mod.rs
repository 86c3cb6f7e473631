//! Output formatting for CLI.

mod json;
mod text;

pub use json::{CardHistoryOutput, HistoryStatsOutput, JsonFormatter, ObservationOutput};
pub use text::TextFormatter;
