//! Boottime measures how long a machine took to boot, broken into stages
//! (firmware, loader, kernel, initrd, userspace and the total), by querying
//! several independent sources of timing data on the host:
//!
//! * the ACPI Firmware Performance Data Table,
//! * the boot loader EFI variables,
//! * the `systemd-analyze time` summary,
//! * the systemd manager monotonic timestamps over D-Bus.
//!
//! These sources routinely disagree. Rather than pick a winner, every
//! analysis produces a [`BootTimeRecord`]: a matrix of stage x method cells
//! keeping each source's own view of the boot. Records are appended to a
//! history file (JSON lines) and can later be averaged with the
//! [`BootTimeAccumulator`] to get a statistically meaningful summary over
//! many boots.
//!
//! **Example** - Analyzing the current boot and averaging the history:
//! ```no_run
//! use boottime as bt;
//!
//! let settings = bt::SettingsBuilder::new().finalize();
//! let record = bt::run_analysis(&settings)?;
//! println!("{}", bt::render_table(&record.to_table()));
//!
//! let average = bt::average_history(&settings.history_file)?;
//! println!("{}", serde_json::to_string(&average).unwrap());
//! # Ok::<(), bt::Error>(())
//! ```
//!
//! Partial data is expected: a source only fills the stages it knows about
//! and leaves the others at zero. A source that cannot be read at all (no
//! UEFI, no systemd...) fails the whole analysis and nothing is recorded.

mod analysis;
mod error;
mod history;
mod model;
mod settings;
mod sources;
mod utils;

pub use analysis::{average_history, collect_boot_times, run_analysis, run_analysis_with};
pub use error::{Error, ErrorKind, Result};
pub use history::{append_record, load_records, read_records};
pub use model::{
    BootTimeAccumulator, BootTimeRecord, BootTimeStage, RetrievalMethod, StageDurations,
};
pub use settings::{Settings, SettingsBuilder};
pub use sources::{
    decode_efi_microseconds, default_sources, efi_boot_times, parse_analyze_output, parse_fbpt,
    parse_fpdt_table, AcpiFirmwareTable, BootTimeSource, EfiVariables, MonotonicTimestamps,
    SystemdAnalyze, SystemdDbus,
};
pub use utils::{format_duration, parse_duration, render_table};
