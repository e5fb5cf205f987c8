//! Boot loader timing exported as EFI variables.
//!
//! Boot loaders implementing the boot loader interface (systemd-boot and
//! friends) store two timestamps in NVRAM, both in microseconds since the
//! firmware started:
//!
//!  * `LoaderTimeInitUSec`: when the loader was initialised,
//!  * `LoaderTimeExecUSec`: when the loader handed over to the kernel.
//!
//! The kernel exposes each variable as a file whose content is a 4-byte
//! attributes header followed by the value as a NUL-terminated UTF-16LE
//! string of decimal digits.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use hexplay::HexViewBuilder;
use log::{debug, log_enabled, trace, Level::Debug};

use super::BootTimeSource;
use crate::{
    error::{Error, Result},
    model::{RetrievalMethod, StageDurations},
    utils::checked_micros,
};

const INIT_PREFIX: &str = "LoaderTimeInitUSec-";
const EXEC_PREFIX: &str = "LoaderTimeExecUSec-";
const ATTRIBUTES_LEN: usize = 4;

// =============================================================================
// Public Interface
// =============================================================================

#[derive(Debug, Clone)]
pub struct EfiVariables {
    dir: PathBuf,
}

impl EfiVariables {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        EfiVariables { dir: dir.into() }
    }

    /// Find the init and exec variables in the directory. Variable file names
    /// carry the vendor GUID after the prefix.
    fn locate(&self) -> Result<(PathBuf, PathBuf)> {
        let entries = fs::read_dir(&self.dir).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::not_found(format!("{}", self.dir.display())),
            _ => Error::io(&self.dir, e),
        })?;

        let (mut init, mut exec) = (None, None);
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&self.dir, e))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(INIT_PREFIX) {
                init = Some(entry.path());
            } else if name.starts_with(EXEC_PREFIX) {
                exec = Some(entry.path());
            }
            if init.is_some() && exec.is_some() {
                break;
            }
        }

        match (init, exec) {
            (Some(init), Some(exec)) => Ok((init, exec)),
            _ => Err(Error::not_found("EFI loader timing variables")),
        }
    }
}

impl BootTimeSource for EfiVariables {
    fn method(&self) -> RetrievalMethod {
        RetrievalMethod::EfiVariable
    }

    fn retrieve(&self) -> Result<StageDurations> {
        let (init_path, exec_path) = self.locate()?;
        debug!(
            "EFI loader variables: {} {}",
            init_path.display(),
            exec_path.display()
        );
        let init = read_variable(&init_path)?;
        let exec = read_variable(&exec_path)?;
        efi_boot_times(&init, &exec)
    }
}

/// Compute the firmware and loader durations from the raw contents of the
/// init and exec variables (attributes header included).
pub fn efi_boot_times(init_raw: &[u8], exec_raw: &[u8]) -> Result<StageDurations> {
    let init = decode_efi_microseconds(strip_attributes(init_raw)?)?;
    let exec = decode_efi_microseconds(strip_attributes(exec_raw)?)?;
    trace!("EFI loader init: {:?}, exec: {:?}", init, exec);

    if exec < init {
        return Err(Error::InvariantViolation(
            "EFI loader exec time < init time".into(),
        ));
    }

    Ok(StageDurations {
        firmware: init,
        loader: exec - init,
        ..Default::default()
    })
}

/// Decode a UTF-16LE, NUL-terminated string of decimal digits as a number of
/// microseconds. `data` must not include the attributes header.
pub fn decode_efi_microseconds(data: &[u8]) -> Result<Duration> {
    if data.len() % 2 != 0 {
        return Err(Error::malformed(
            "EFI variable",
            format!("invalid UTF-16 length {}", data.len()),
        ));
    }

    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    let text = String::from_utf16(&units).map_err(|e| Error::malformed("EFI variable", e))?;

    let us = text
        .parse::<u64>()
        .map_err(|e| Error::malformed("EFI variable", format!("`{}`: {}", text, e)))?;
    checked_micros(us)
        .ok_or_else(|| Error::malformed("EFI variable", format!("{}us is out of range", us)))
}

// =============================================================================
// Private Implementation
// =============================================================================

fn read_variable(path: &Path) -> Result<Vec<u8>> {
    let data = fs::read(path).map_err(|e| Error::io(path, e))?;

    if log_enabled!(Debug) {
        let view = HexViewBuilder::new(&data)
            .address_offset(0)
            .row_width(16)
            .finish();
        debug!("{}:\n{}", path.display(), view);
    }

    Ok(data)
}

fn strip_attributes(data: &[u8]) -> Result<&[u8]> {
    if data.len() < ATTRIBUTES_LEN {
        return Err(Error::malformed(
            "EFI variable",
            format!("too short ({} bytes)", data.len()),
        ));
    }
    Ok(&data[ATTRIBUTES_LEN..])
}

// =============================================================================
// Unit Tests
// =============================================================================
