//! Firmware boot performance from the ACPI Firmware Performance Data Table.
//!
//! The FPDT itself only holds pointers. The boot timings live in the Firmware
//! Basic Boot Performance Table (FBPT) somewhere in physical memory:
//!
//! ```text
//!   FPDT (ACPI table, exposed under /sys/firmware/acpi/tables)
//!   +--------------------+------------------------------------------+
//!   | SDT header (36 B)  | record type 0: FBPT pointer (16 B) | ... |
//!   +--------------------+------------------------------------------+
//!                                              |
//!                                              v  physical address
//!   FBPT (read through /dev/mem)
//!   +------------------+---------------------------------------------+
//!   | "FBPT" + length  | record type 2: basic boot performance (48 B) |
//!   +------------------+---------------------------------------------+
//! ```
//!
//! All timestamps in the boot performance record are nanoseconds since the
//! processor reset.

use std::{
    fs::{self, File},
    io::{self, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
    time::Duration,
};

use log::{debug, trace};

use super::BootTimeSource;
use crate::{
    error::{Error, Result},
    model::{RetrievalMethod, StageDurations},
};

const SDT_HEADER_LEN: usize = 36;
const RECORD_HEADER_LEN: usize = 4;
const FBPT_HEADER_LEN: usize = 8;

const FPDT_BOOT_POINTER_RECORD: u16 = 0x0000;
const FPDT_BOOT_POINTER_RECORD_LEN: usize = 16;
const FBPT_BOOT_RECORD: u16 = 0x0002;
const FBPT_BOOT_RECORD_LEN: usize = 48;

/// Tables larger than this are not plausible and are not read from memory.
const FBPT_MAX_LEN: usize = 64 * 1024;
const NANOS_PER_HOUR: u64 = 3_600 * 1_000_000_000;

// =============================================================================
// Public Interface
// =============================================================================

#[derive(Debug, Clone)]
pub struct AcpiFirmwareTable {
    table: PathBuf,
    mem_device: PathBuf,
}

impl AcpiFirmwareTable {
    pub fn new(table: impl Into<PathBuf>, mem_device: impl Into<PathBuf>) -> Self {
        AcpiFirmwareTable {
            table: table.into(),
            mem_device: mem_device.into(),
        }
    }
}

impl BootTimeSource for AcpiFirmwareTable {
    fn method(&self) -> RetrievalMethod {
        RetrievalMethod::AcpiFirmwareTable
    }

    fn retrieve(&self) -> Result<StageDurations> {
        let table = fs::read(&self.table).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::not_found(format!("{}", self.table.display())),
            _ => Error::io(&self.table, e),
        })?;
        let address = parse_fpdt_table(&table)?;
        debug!("FBPT at physical address {:#x}", address);

        let fbpt = read_physical(&self.mem_device, address)?;
        parse_fbpt(&fbpt)
    }
}

/// Find the physical address of the FBPT in the raw FPDT.
pub fn parse_fpdt_table(data: &[u8]) -> Result<u64> {
    if data.len() < SDT_HEADER_LEN {
        return Err(Error::malformed(
            "FPDT",
            format!("table too short ({} bytes)", data.len()),
        ));
    }
    if &data[..4] != b"FPDT" {
        return Err(Error::malformed("FPDT", "bad signature"));
    }
    let length = read_u32(data, 4).unwrap_or(0) as usize;
    if length < SDT_HEADER_LEN || length > data.len() {
        return Err(Error::malformed(
            "FPDT",
            format!("table length {} out of bounds", length),
        ));
    }

    let records = records(&data[SDT_HEADER_LEN..length], "FPDT")?;
    let pointer = records
        .into_iter()
        .find(|(kind, body)| {
            *kind == FPDT_BOOT_POINTER_RECORD && body.len() >= FPDT_BOOT_POINTER_RECORD_LEN
        })
        .ok_or_else(|| Error::not_found("FPDT firmware basic boot performance pointer"))?;

    read_u64(pointer.1, 8).ok_or_else(|| Error::malformed("FPDT", "truncated pointer record"))
}

/// Extract the firmware and loader durations from the raw FBPT.
///
/// The firmware stage ends when the OS loader is started, the loader stage
/// ends when it calls `ExitBootServices()`.
pub fn parse_fbpt(data: &[u8]) -> Result<StageDurations> {
    if data.len() < FBPT_HEADER_LEN || &data[..4] != b"FBPT" {
        return Err(Error::malformed("FBPT", "bad signature"));
    }
    let length = read_u32(data, 4).unwrap_or(0) as usize;
    if length < FBPT_HEADER_LEN || length > data.len() {
        return Err(Error::malformed(
            "FBPT",
            format!("table length {} out of bounds", length),
        ));
    }

    let (_, record) = records(&data[FBPT_HEADER_LEN..length], "FBPT")?
        .into_iter()
        .find(|(kind, body)| *kind == FBPT_BOOT_RECORD && body.len() >= FBPT_BOOT_RECORD_LEN)
        .ok_or_else(|| Error::not_found("FBPT basic boot performance record"))?;

    let field = |offset| {
        read_u64(record, offset).ok_or_else(|| Error::malformed("FBPT", "truncated boot record"))
    };
    let reset_end = field(8)?;
    let startup_start = field(24)?;
    let exit_services_exit = field(40)?;
    trace!(
        "FBPT reset end: {}ns, OS loader start: {}ns, exit boot services: {}ns",
        reset_end,
        startup_start,
        exit_services_exit
    );

    if exit_services_exit == 0 {
        // The loader never called ExitBootServices(): not a UEFI boot.
        return Err(Error::not_found("FBPT exit boot services timestamp"));
    }
    if startup_start == 0 || exit_services_exit < startup_start {
        return Err(Error::InvariantViolation(
            "FBPT exit boot services time < OS loader start time".into(),
        ));
    }
    if exit_services_exit > NANOS_PER_HOUR {
        return Err(Error::malformed(
            "FBPT",
            format!("implausible exit boot services time {}ns", exit_services_exit),
        ));
    }

    // Microsecond resolution, as every other source.
    let loader_start = startup_start / 1_000;
    let loader_exit = exit_services_exit / 1_000;
    Ok(StageDurations {
        firmware: Duration::from_micros(loader_start),
        loader: Duration::from_micros(loader_exit - loader_start),
        ..Default::default()
    })
}

// =============================================================================
// Private Implementation
// =============================================================================

/// Split a table body into `(type, record)` pairs. Each record includes its
/// own 4-byte header.
fn records<'a>(mut body: &'a [u8], table: &str) -> Result<Vec<(u16, &'a [u8])>> {
    let mut found = Vec::new();
    while body.len() >= RECORD_HEADER_LEN {
        let kind = read_u16(body, 0).unwrap_or(0);
        let length = body[2] as usize;
        if length < RECORD_HEADER_LEN || length > body.len() {
            return Err(Error::malformed(
                table,
                format!("record of type {} has invalid length {}", kind, length),
            ));
        }
        found.push((kind, &body[..length]));
        body = &body[length..];
    }
    Ok(found)
}

fn read_physical(device: &Path, address: u64) -> Result<Vec<u8>> {
    let io_err = |e| Error::io(device, e);
    let mut mem = File::open(device).map_err(io_err)?;

    mem.seek(SeekFrom::Start(address)).map_err(io_err)?;
    let mut header = [0u8; FBPT_HEADER_LEN];
    mem.read_exact(&mut header).map_err(io_err)?;
    let length = read_u32(&header, 4).unwrap_or(0) as usize;
    if length < FBPT_HEADER_LEN || length > FBPT_MAX_LEN {
        return Err(Error::malformed(
            "FBPT",
            format!("table length {} out of bounds", length),
        ));
    }

    let mut table = vec![0u8; length];
    mem.seek(SeekFrom::Start(address)).map_err(io_err)?;
    mem.read_exact(&mut table).map_err(io_err)?;
    Ok(table)
}

fn read_u16(data: &[u8], offset: usize) -> Option<u16> {
    Some(u16::from_le_bytes(data.get(offset..offset + 2)?.try_into().ok()?))
}

fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    Some(u32::from_le_bytes(data.get(offset..offset + 4)?.try_into().ok()?))
}

fn read_u64(data: &[u8], offset: usize) -> Option<u64> {
    Some(u64::from_le_bytes(data.get(offset..offset + 8)?.try_into().ok()?))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn fpdt(records: &[Vec<u8>]) -> Vec<u8> {
        let body: Vec<u8> = records.concat();
        let mut table = b"FPDT".to_vec();
        table.extend_from_slice(&((SDT_HEADER_LEN + body.len()) as u32).to_le_bytes());
        table.resize(SDT_HEADER_LEN, 0);
        table.extend_from_slice(&body);
        table
    }

    fn pointer_record(address: u64) -> Vec<u8> {
        let mut record = vec![0x00, 0x00, 16, 1, 0, 0, 0, 0];
        record.extend_from_slice(&address.to_le_bytes());
        record
    }

    fn fbpt(startup_start: u64, exit_services_exit: u64) -> Vec<u8> {
        let mut record = vec![0x02, 0x00, 48, 2, 0, 0, 0, 0];
        for value in &[1_000_000u64, 0, startup_start, 0, exit_services_exit] {
            record.extend_from_slice(&value.to_le_bytes());
        }
        let mut table = b"FBPT".to_vec();
        table.extend_from_slice(&((FBPT_HEADER_LEN + record.len()) as u32).to_le_bytes());
        table.extend_from_slice(&record);
        table
    }

    #[test]
    fn finds_the_boot_performance_pointer() {
        let other = vec![0x01, 0x00, 16, 1, 0, 0, 0, 0, 9, 9, 9, 9, 9, 9, 9, 9];
        let table = fpdt(&[other, pointer_record(0x7a3c_1000)]);
        assert_eq!(parse_fpdt_table(&table).unwrap(), 0x7a3c_1000);
    }

    #[test]
    fn missing_pointer_is_not_found() {
        let table = fpdt(&[]);
        assert_eq!(
            parse_fpdt_table(&table).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn bad_tables_are_malformed() {
        let err = parse_fpdt_table(b"FPDT").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedData);

        let mut table = fpdt(&[pointer_record(0x1000)]);
        table[..4].copy_from_slice(b"SSDT");
        assert_eq!(
            parse_fpdt_table(&table).unwrap_err().kind(),
            ErrorKind::MalformedData
        );

        // A record claiming to be longer than the table.
        let table = fpdt(&[vec![0x00, 0x00, 200, 1]]);
        assert_eq!(
            parse_fpdt_table(&table).unwrap_err().kind(),
            ErrorKind::MalformedData
        );
    }

    #[test]
    fn decodes_firmware_and_loader() {
        let times = parse_fbpt(&fbpt(4_512_345_678, 6_000_001_999)).unwrap();
        assert_eq!(times.firmware, Duration::from_micros(4_512_345));
        assert_eq!(times.loader, Duration::from_micros(6_000_001 - 4_512_345));
        assert_eq!(times.total, Duration::ZERO);
    }

    #[test]
    fn inconsistent_timestamps_are_rejected() {
        assert_eq!(
            parse_fbpt(&fbpt(5_000_000, 0)).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            parse_fbpt(&fbpt(5_000_000, 4_000_000)).unwrap_err().kind(),
            ErrorKind::InvariantViolation
        );
        assert_eq!(
            parse_fbpt(&fbpt(5_000_000, 2 * NANOS_PER_HOUR))
                .unwrap_err()
                .kind(),
            ErrorKind::MalformedData
        );
    }

    #[test]
    fn reads_the_fbpt_through_the_memory_device() {
        let dir = tempfile::tempdir().unwrap();
        let address = 0x200u64;
        let mut mem = vec![0xffu8; address as usize];
        mem.extend_from_slice(&fbpt(2_000_000_000, 2_750_000_000));
        fs::write(dir.path().join("mem"), &mem).unwrap();
        fs::write(dir.path().join("FPDT"), fpdt(&[pointer_record(address)])).unwrap();

        let source = AcpiFirmwareTable::new(dir.path().join("FPDT"), dir.path().join("mem"));
        let times = source.retrieve().unwrap();
        assert_eq!(times.firmware, Duration::from_secs(2));
        assert_eq!(times.loader, Duration::from_millis(750));
    }

    #[test]
    fn missing_table_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = AcpiFirmwareTable::new(dir.path().join("FPDT"), dir.path().join("mem"));
        assert_eq!(source.retrieve().unwrap_err().kind(), ErrorKind::NotFound);
    }
}
