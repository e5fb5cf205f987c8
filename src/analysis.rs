//! Running the boot time sources and reconciling their results.
//!
//! ```text
//!   acpi_fpdt ----.
//!   efi_var ------+--> join all --> BootTimeRecord --> history file
//!   systemd_* ----'      |
//!                        '-- any error: nothing recorded
//! ```
//!
//! An analysis is all or nothing: every source must succeed for a record to
//! be produced and appended to the history. The record keeps each source's
//! values side by side; no source is used to correct another.

use std::{panic, path::Path, thread};

use log::{debug, info};

use crate::{
    error::{Error, Result},
    history,
    model::{BootTimeAccumulator, BootTimeRecord, RetrievalMethod, StageDurations},
    settings::Settings,
    sources::{default_sources, BootTimeSource},
};

// =============================================================================
// Public Interface
// =============================================================================

/// Run the standard sources configured by `settings` and append the combined
/// record to the history file.
pub fn run_analysis(settings: &Settings) -> Result<BootTimeRecord> {
    run_analysis_with(&default_sources(settings), &settings.history_file)
}

/// Run `sources` and append the combined record to `history_file`.
pub fn run_analysis_with(
    sources: &[Box<dyn BootTimeSource>],
    history_file: &Path,
) -> Result<BootTimeRecord> {
    let record = collect_boot_times(sources)?;
    history::append_record(history_file, &record)?;
    Ok(record)
}

/// Run every source on its own thread and wait for all of them.
///
/// Fails with the error of the first source (in `sources` order) that failed,
/// wrapped in [`Error::Source`]. The other results are dropped.
pub fn collect_boot_times(sources: &[Box<dyn BootTimeSource>]) -> Result<BootTimeRecord> {
    info!("retrieving boot times from {} sources", sources.len());

    let results: Vec<(RetrievalMethod, Result<StageDurations>)> = thread::scope(|scope| {
        let handles: Vec<_> = sources
            .iter()
            .map(|source| (source.method(), scope.spawn(move || source.retrieve())))
            .collect();
        handles
            .into_iter()
            .map(|(method, handle)| {
                let result = handle
                    .join()
                    .unwrap_or_else(|payload| panic::resume_unwind(payload));
                (method, result)
            })
            .collect()
    });

    let mut durations = Vec::with_capacity(results.len());
    for (method, result) in results {
        match result {
            Ok(times) => {
                debug!("{}: {:?}", method, times);
                durations.push((method, times));
            }
            Err(source) => {
                return Err(Error::Source {
                    method,
                    source: Box::new(source),
                })
            }
        }
    }

    Ok(BootTimeRecord::from_sources(
        durations.iter().map(|(method, times)| (*method, times)),
    ))
}

/// Replay the history file and average its records.
pub fn average_history(history_file: &Path) -> Result<BootTimeRecord> {
    let records = history::load_records(history_file)?;
    info!(
        "averaging {} records from {}",
        records.len(),
        history_file.display()
    );

    let mut acc = BootTimeAccumulator::new();
    acc.extend(records.iter());
    Ok(acc.average())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{error::ErrorKind, model::BootTimeStage};

    /// A source returning canned durations, or failing.
    struct Canned {
        method: RetrievalMethod,
        firmware_ms: Option<u64>,
    }

    impl BootTimeSource for Canned {
        fn method(&self) -> RetrievalMethod {
            self.method
        }

        fn retrieve(&self) -> Result<StageDurations> {
            match self.firmware_ms {
                Some(ms) => Ok(StageDurations {
                    firmware: Duration::from_millis(ms),
                    kernel: Duration::from_millis(ms / 2),
                    ..Default::default()
                }),
                None => Err(Error::not_found("canned data")),
            }
        }
    }

    fn sources(firmware_ms: [Option<u64>; 4]) -> Vec<Box<dyn BootTimeSource>> {
        RetrievalMethod::ALL
            .iter()
            .zip(firmware_ms.iter())
            .map(|(&method, &firmware_ms)| {
                Box::new(Canned {
                    method,
                    firmware_ms,
                }) as Box<dyn BootTimeSource>
            })
            .collect()
    }

    #[test]
    fn combines_every_source() {
        let firmware_ms = [1_000, 1_100, 1_200, 1_300];
        let record = collect_boot_times(&sources(firmware_ms.map(Some))).unwrap();
        for (method, ms) in RetrievalMethod::ALL.iter().zip(firmware_ms.iter()) {
            assert_eq!(
                record.get(BootTimeStage::Firmware, *method),
                Some(Duration::from_millis(*ms))
            );
        }
        // Firmware-side sources do not get a kernel column.
        assert_eq!(
            record.get(BootTimeStage::Kernel, RetrievalMethod::EfiVariable),
            None
        );
        assert_eq!(
            record.get(BootTimeStage::Kernel, RetrievalMethod::TextSummary),
            Some(Duration::from_millis(600))
        );
    }

    #[test]
    fn one_failing_source_fails_the_analysis_and_records_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let history = dir.path().join("boottime.jsonl");

        let err = run_analysis_with(&sources([None, Some(1), Some(2), Some(3)]), &history)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(matches!(
            err,
            Error::Source {
                method: RetrievalMethod::AcpiFirmwareTable,
                ..
            }
        ));
        assert!(!history.exists());
    }

    #[test]
    fn first_failure_in_source_order_is_reported() {
        let err = collect_boot_times(&sources([Some(1), Some(2), None, None])).unwrap_err();
        assert!(matches!(
            err,
            Error::Source {
                method: RetrievalMethod::TextSummary,
                ..
            }
        ));
    }

    #[test]
    fn analyses_accumulate_into_an_average() {
        let dir = tempfile::tempdir().unwrap();
        let history = dir.path().join("boottime.jsonl");

        for firmware_ms in [[1_000, 1_000, 2_000, 2_000], [3_000, 1_000, 4_000, 2_000]] {
            run_analysis_with(&sources(firmware_ms.map(Some)), &history).unwrap();
        }

        let average = average_history(&history).unwrap();
        assert_eq!(
            average.get(BootTimeStage::Firmware, RetrievalMethod::AcpiFirmwareTable),
            Some(Duration::from_millis(2_000))
        );
        assert_eq!(
            average.get(BootTimeStage::Firmware, RetrievalMethod::TextSummary),
            Some(Duration::from_millis(3_000))
        );
        // Reported as zero in every run: stays zero, but present.
        assert_eq!(
            average.get(BootTimeStage::Initrd, RetrievalMethod::IpcProperty),
            Some(Duration::ZERO)
        );
    }
}
