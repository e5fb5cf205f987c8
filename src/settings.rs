//! Settings locating the boot time sources and the history file.
//!
//! Use the [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
//! pattern to set the configurable values.

use std::path::PathBuf;

// =============================================================================
// Public Interface
// =============================================================================

/// Groups all settings used by `boottime` to find its sources of boot timing
/// data and acts as a
/// [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
/// for the settings.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Settings {
    /// Directory where the kernel exposes the EFI variables.
    pub efivars_dir: PathBuf,
    /// The raw ACPI Firmware Performance Data Table.
    pub fpdt_table: PathBuf,
    /// Device giving access to physical memory, used to read the firmware
    /// basic boot performance table the FPDT points to.
    pub mem_device: PathBuf,
    /// Program printing the one-line boot summary.
    pub analyze_program: String,
    /// Arguments passed to `analyze_program`.
    pub analyze_args: Vec<String>,

    /// Append-only log of boot time records, one JSON object per line.
    pub history_file: PathBuf,

    /// Restrict creation of `Settings` instances unless through the
    /// `SettingsBuilder`.
    #[doc(hidden)]
    _private_use_builder: (),
}

/// The builder for the `Settings` values.
///
/// All values are optional and have default values that will be used if not
/// explicitly set.
///
/// **Example**
///
/// ```
/// use boottime::SettingsBuilder;
///
/// let settings = SettingsBuilder::new().history_file("/var/lib/boottime.jsonl").finalize();
/// assert_eq!(settings.analyze_program, "systemd-analyze");
/// ```
#[derive(Default)]
pub struct SettingsBuilder {
    settings: Settings,
}
impl SettingsBuilder {
    /// Start building the settings using the standard Linux locations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the directory holding the EFI variables
    pub fn efivars_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.efivars_dir = path.into();
        self
    }

    /// Set the path to the raw ACPI FPDT table
    pub fn fpdt_table(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.fpdt_table = path.into();
        self
    }

    /// Set the physical memory device
    pub fn mem_device(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.mem_device = path.into();
        self
    }

    /// Set the command printing the boot summary, with its arguments
    pub fn analyze_command<'a, I>(mut self, program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.settings.analyze_program = program.to_owned();
        self.settings.analyze_args = args.into_iter().map(str::to_owned).collect();
        self
    }

    /// Set the boot summary command from a whitespace separated command line,
    /// e.g. `"systemd-analyze --user time"`. A blank line changes nothing.
    pub fn analyze_command_line(self, line: &str) -> Self {
        let mut words = line.split_whitespace();
        match words.next() {
            Some(program) => self.analyze_command(program, words),
            None => self,
        }
    }

    /// Set the path to the history file
    pub fn history_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.history_file = path.into();
        self
    }

    pub fn finalize(self) -> Settings {
        self.settings
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            efivars_dir: "/sys/firmware/efi/efivars".into(),
            fpdt_table: "/sys/firmware/acpi/tables/FPDT".into(),
            mem_device: "/dev/mem".into(),
            analyze_program: "systemd-analyze".into(),
            analyze_args: vec!["time".into()],
            history_file: "boottime.jsonl".into(),
            _private_use_builder: (),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
