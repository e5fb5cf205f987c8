//! Helper functions for durations and console output.

mod duration;
mod table;

pub(crate) use duration::checked_micros;
pub use duration::{format_duration, parse_duration};
pub use table::render_table;
