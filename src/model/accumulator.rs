//! Running average of boot time records.

use std::{collections::BTreeMap, time::Duration};

use super::{BootTimeRecord, BootTimeStage, RetrievalMethod};

// =============================================================================
// Public Interface
// =============================================================================

/// Reduces a series of [`BootTimeRecord`]s into one averaged record.
///
/// Every cell keeps a running sum and the number of records that actually
/// reported a value for it. Zero durations are added to the sum (which is a
/// no-op) but not counted, so a method that never reports a stage does not
/// drag its average down.
///
/// The result does not depend on the order records are added in.
///
/// **Example**
/// ```
/// use boottime::{BootTimeAccumulator, BootTimeRecord};
///
/// let mut acc = BootTimeAccumulator::new();
/// acc.add(&BootTimeRecord::default());
/// assert!(acc.average().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct BootTimeAccumulator {
    cells: BTreeMap<BootTimeStage, BTreeMap<RetrievalMethod, Cell>>,
}

impl BootTimeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: &BootTimeRecord) {
        for (stage, method, duration) in record.cells() {
            let cell = self
                .cells
                .entry(stage)
                .or_default()
                .entry(method)
                .or_default();
            cell.sum += duration;
            if !duration.is_zero() {
                cell.count += 1;
            }
        }
    }

    /// Consume the accumulator and produce the averaged record. Cells that
    /// were seen but never reported come out as zero.
    pub fn average(self) -> BootTimeRecord {
        self.cells
            .into_iter()
            .flat_map(|(stage, methods)| {
                methods
                    .into_iter()
                    .map(move |(method, cell)| ((stage, method), cell.mean()))
            })
            .collect()
    }
}

impl<'a> Extend<&'a BootTimeRecord> for BootTimeAccumulator {
    fn extend<T: IntoIterator<Item = &'a BootTimeRecord>>(&mut self, records: T) {
        for record in records {
            self.add(record);
        }
    }
}

// =============================================================================
// Private Implementation
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
struct Cell {
    sum: Duration,
    count: u32,
}

impl Cell {
    fn mean(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.sum / self.count
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
