//! Append-only history of boot time records, one JSON object per line.

use std::{
    fs::{File, OpenOptions},
    io::{self, BufRead, BufReader, Write},
    path::Path,
};

use log::debug;

use crate::{
    error::{Error, Result},
    model::BootTimeRecord,
};

// =============================================================================
// Public Interface
// =============================================================================

/// Append `record` as a single line at the end of the history file, creating
/// the file if needed.
pub fn append_record(path: &Path, record: &BootTimeRecord) -> Result<()> {
    let line = serde_json::to_string(record).map_err(|e| Error::io(path, io::Error::from(e)))?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::io(path, e))?;
    writeln!(file, "{}", line).map_err(|e| Error::io(path, e))?;

    debug!("record appended to {}", path.display());
    Ok(())
}

/// Read every record of the history file.
pub fn load_records(path: &Path) -> Result<Vec<BootTimeRecord>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    read_records(BufReader::new(file), path)
}

/// Decode the records from `reader`. Blank lines are skipped; any other line
/// that does not decode fails the whole read, so that a corrupted history is
/// noticed rather than silently averaged. `path` only names the source in
/// errors.
pub fn read_records<R: BufRead>(reader: R, path: &Path) -> Result<Vec<BootTimeRecord>> {
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| Error::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            line: idx + 1,
            source,
        })?;
        records.push(record);
    }
    debug!("{} records read from {}", records.len(), path.display());
    Ok(records)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::{fs, time::Duration};

    use super::*;
    use crate::{
        error::ErrorKind,
        model::{BootTimeStage, RetrievalMethod},
    };

    fn record(ms: u64) -> BootTimeRecord {
        vec![
            (
                (BootTimeStage::Firmware, RetrievalMethod::AcpiFirmwareTable),
                Duration::from_millis(ms),
            ),
            (
                (BootTimeStage::Total, RetrievalMethod::IpcProperty),
                Duration::from_micros(ms * 7_001),
            ),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn appended_records_read_back_equal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boottime.jsonl");

        append_record(&path, &record(1_200)).unwrap();
        append_record(&path, &record(1_350)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert_eq!(load_records(&path).unwrap(), vec![record(1_200), record(1_350)]);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let input = "\n{\"kernel\":{\"systemd_analyze\":2000000000}}\n\n";
        let records = read_records(input.as_bytes(), Path::new("test")).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn corrupt_line_fails_the_read() {
        let input = "{\"kernel\":{\"systemd_analyze\":2000000000}}\n{\"kernel\":\n";
        let err = read_records(input.as_bytes(), Path::new("test")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedData);
        assert!(matches!(err, Error::Json { line: 2, .. }));
    }

    #[test]
    fn missing_history_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_records(&dir.path().join("nope.jsonl")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
