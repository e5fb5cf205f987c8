//! Boot stages and the methods used to measure them.

use std::{fmt, str::FromStr};

// =============================================================================
// Public Interface
// =============================================================================

// BootTimeStage ===============================================================

/// A named phase of the boot sequence, ordered as the machine goes through
/// them. `Total` always comes last.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum BootTimeStage {
    Firmware,
    Loader,
    Kernel,
    Initrd,
    Userspace,
    Total,
}

impl BootTimeStage {
    pub const ALL: [BootTimeStage; 6] = [
        BootTimeStage::Firmware,
        BootTimeStage::Loader,
        BootTimeStage::Kernel,
        BootTimeStage::Initrd,
        BootTimeStage::Userspace,
        BootTimeStage::Total,
    ];

    /// The key used for this stage in the history file.
    pub fn as_str(&self) -> &'static str {
        match self {
            BootTimeStage::Firmware => "firmware",
            BootTimeStage::Loader => "loader",
            BootTimeStage::Kernel => "kernel",
            BootTimeStage::Initrd => "initrd",
            BootTimeStage::Userspace => "userspace",
            BootTimeStage::Total => "total",
        }
    }
}

impl fmt::Display for BootTimeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BootTimeStage {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BootTimeStage::ALL
            .iter()
            .copied()
            .find(|stage| stage.as_str() == s)
            .ok_or(())
    }
}

// RetrievalMethod =============================================================

const FIRMWARE_STAGES: &[BootTimeStage] = &[BootTimeStage::Firmware, BootTimeStage::Loader];

/// The telemetry source a duration was obtained from.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum RetrievalMethod {
    /// ACPI Firmware Performance Data Table.
    AcpiFirmwareTable,
    /// `LoaderTime*USec` EFI variables exported by the boot loader.
    EfiVariable,
    /// The one-line summary printed by `systemd-analyze time`.
    TextSummary,
    /// systemd manager monotonic timestamps read over D-Bus.
    IpcProperty,
}

impl RetrievalMethod {
    pub const ALL: [RetrievalMethod; 4] = [
        RetrievalMethod::AcpiFirmwareTable,
        RetrievalMethod::EfiVariable,
        RetrievalMethod::TextSummary,
        RetrievalMethod::IpcProperty,
    ];

    /// The key used for this method in the history file.
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalMethod::AcpiFirmwareTable => "acpi_fpdt",
            RetrievalMethod::EfiVariable => "efi_var",
            RetrievalMethod::TextSummary => "systemd_analyze",
            RetrievalMethod::IpcProperty => "systemd_dbus",
        }
    }

    /// The stages this method is able to report on.
    ///
    /// Firmware-side sources only know about what happened before the kernel
    /// took over; systemd knows about the whole sequence.
    pub fn stages(&self) -> &'static [BootTimeStage] {
        match self {
            RetrievalMethod::AcpiFirmwareTable | RetrievalMethod::EfiVariable => FIRMWARE_STAGES,
            RetrievalMethod::TextSummary | RetrievalMethod::IpcProperty => &BootTimeStage::ALL,
        }
    }
}

impl fmt::Display for RetrievalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetrievalMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RetrievalMethod::ALL
            .iter()
            .copied()
            .find(|method| method.as_str() == s)
            .ok_or(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
