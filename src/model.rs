//! Boot time data model.
//!
//! A [`BootTimeRecord`] is a matrix of [`BootTimeStage`] x [`RetrievalMethod`]
//! cells, each holding the duration one method measured for one stage. The
//! record deliberately keeps the disagreement between methods: nothing in the
//! model tries to correct one source with another.
//!
//! ```text
//!               acpi_fpdt   efi_var   systemd_analyze   systemd_dbus
//!   firmware        x          x             x                x
//!   loader          x          x             x                x
//!   kernel                                   x                x
//!   initrd                                   x                x
//!   userspace                                x                x
//!   total                                    x                x
//! ```
//!
//! A cell that is absent, or that holds a zero duration, means the method did
//! not report the stage. The [`BootTimeAccumulator`] relies on that to average
//! a history of records without being biased by the silent methods.

mod accumulator;
mod record;
mod stage;

pub use accumulator::BootTimeAccumulator;
pub use record::{BootTimeRecord, StageDurations};
pub use stage::{BootTimeStage, RetrievalMethod};
