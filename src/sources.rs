//! Readers for the independent sources of boot timing data.
//!
//! Each source measures the boot with its own mechanism and reports a
//! best-effort [`StageDurations`]:
//!
//!  * [`EfiVariables`] decodes the `LoaderTimeInitUSec` and
//!    `LoaderTimeExecUSec` variables the boot loader leaves in NVRAM.
//!  * [`AcpiFirmwareTable`] follows the ACPI FPDT to the firmware basic boot
//!    performance record.
//!  * [`SystemdAnalyze`] parses the summary line printed by
//!    `systemd-analyze time`.
//!  * [`SystemdDbus`] reads the systemd manager monotonic timestamps over
//!    D-Bus and redoes systemd's own arithmetic.
//!
//! Sources disagree with each other and that is expected. They are not
//! reconciled here; see [`analysis`](crate::analysis).

mod acpi;
mod efi;
mod systemd_analyze;
mod systemd_dbus;

pub use acpi::{parse_fbpt, parse_fpdt_table, AcpiFirmwareTable};
pub use efi::{decode_efi_microseconds, efi_boot_times, EfiVariables};
pub use systemd_analyze::{parse_analyze_output, SystemdAnalyze};
pub use systemd_dbus::{MonotonicTimestamps, SystemdDbus};

use crate::{
    error::Result,
    model::{RetrievalMethod, StageDurations},
    settings::Settings,
};

// =============================================================================
// Public Interface
// =============================================================================

/// A source of boot timing data.
///
/// Implementations do blocking I/O and are run concurrently, one thread each,
/// by the analysis; they must not share mutable state.
pub trait BootTimeSource: Send + Sync {
    /// The column this source fills in the combined record.
    fn method(&self) -> RetrievalMethod;

    /// Retrieve the boot times. Errors are reported as is, without retrying.
    fn retrieve(&self) -> Result<StageDurations>;
}

/// The four standard sources, configured from `settings`, in
/// [`RetrievalMethod::ALL`] order.
pub fn default_sources(settings: &Settings) -> Vec<Box<dyn BootTimeSource>> {
    vec![
        Box::new(AcpiFirmwareTable::new(
            settings.fpdt_table.clone(),
            settings.mem_device.clone(),
        )),
        Box::new(EfiVariables::new(settings.efivars_dir.clone())),
        Box::new(SystemdAnalyze::new(
            settings.analyze_program.clone(),
            settings.analyze_args.clone(),
        )),
        Box::new(SystemdDbus::new()),
    ]
}

// =============================================================================
// Unit Tests
// =============================================================================
