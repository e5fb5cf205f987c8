//! The per-source and the combined boot time records.

use std::{collections::BTreeMap, time::Duration};

use serde::{Deserialize, Serialize};

use super::{BootTimeStage, RetrievalMethod};
use crate::utils::format_duration;

// =============================================================================
// Public Interface
// =============================================================================

// StageDurations ==============================================================

/// What a single source reader measured, one duration per stage.
///
/// Stages the source knows nothing about stay at zero.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct StageDurations {
    pub firmware: Duration,
    pub loader: Duration,
    pub kernel: Duration,
    pub initrd: Duration,
    pub userspace: Duration,
    pub total: Duration,
}

impl StageDurations {
    pub fn get(&self, stage: BootTimeStage) -> Duration {
        match stage {
            BootTimeStage::Firmware => self.firmware,
            BootTimeStage::Loader => self.loader,
            BootTimeStage::Kernel => self.kernel,
            BootTimeStage::Initrd => self.initrd,
            BootTimeStage::Userspace => self.userspace,
            BootTimeStage::Total => self.total,
        }
    }
}

// BootTimeRecord ==============================================================

/// The stage x method matrix produced by one analysis run.
///
/// Records are built once, from an iterator of cells or by folding the
/// per-source [`StageDurations`], and are not modified afterwards.
///
/// **Example**
/// ```
/// use std::time::Duration;
/// use boottime::{BootTimeRecord, BootTimeStage, RetrievalMethod};
///
/// let record: BootTimeRecord = vec![(
///     (BootTimeStage::Kernel, RetrievalMethod::TextSummary),
///     Duration::from_millis(1_500),
/// )]
/// .into_iter()
/// .collect();
/// assert_eq!(
///     record.get(BootTimeStage::Kernel, RetrievalMethod::TextSummary),
///     Some(Duration::from_millis(1_500))
/// );
/// ```
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireRecord", into = "WireRecord")]
pub struct BootTimeRecord {
    values: BTreeMap<BootTimeStage, BTreeMap<RetrievalMethod, Duration>>,
}

impl BootTimeRecord {
    /// Fold the results of the source readers into one record. Each reader
    /// fills the cells of the stages its method covers, zero values included.
    pub fn from_sources<'a, I>(sources: I) -> Self
    where
        I: IntoIterator<Item = (RetrievalMethod, &'a StageDurations)>,
    {
        sources
            .into_iter()
            .flat_map(|(method, durations)| {
                method
                    .stages()
                    .iter()
                    .map(move |&stage| ((stage, method), durations.get(stage)))
            })
            .collect()
    }

    /// The raw cell value. `Some(Duration::ZERO)` is possible and, like
    /// `None`, means the method did not report the stage.
    pub fn get(&self, stage: BootTimeStage, method: RetrievalMethod) -> Option<Duration> {
        self.values
            .get(&stage)
            .and_then(|methods| methods.get(&method))
            .copied()
    }

    /// The cell value, only if the method actually reported the stage.
    pub fn reported(&self, stage: BootTimeStage, method: RetrievalMethod) -> Option<Duration> {
        self.get(stage, method).filter(|d| !d.is_zero())
    }

    /// All present cells, in stage then method order.
    pub fn cells(&self) -> impl Iterator<Item = (BootTimeStage, RetrievalMethod, Duration)> + '_ {
        self.values.iter().flat_map(|(&stage, methods)| {
            methods
                .iter()
                .map(move |(&method, &duration)| (stage, method, duration))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Mean of the reported durations for one stage across all methods.
    pub fn overall(&self, stage: BootTimeStage) -> Option<Duration> {
        let reported: Vec<Duration> = RetrievalMethod::ALL
            .iter()
            .filter_map(|&method| self.reported(stage, method))
            .collect();
        if reported.is_empty() {
            return None;
        }
        Some(reported.iter().sum::<Duration>() / reported.len() as u32)
    }

    /// Lay the record out as rows of text cells: a header row, then one row
    /// per stage with one column per method and a final `overall` column.
    /// Cells the method did not report are shown as `-`.
    pub fn to_table(&self) -> Vec<Vec<String>> {
        let mut rows = Vec::with_capacity(BootTimeStage::ALL.len() + 1);

        let mut header = vec!["stage".to_string()];
        header.extend(RetrievalMethod::ALL.iter().map(|m| m.to_string()));
        header.push("overall".into());
        rows.push(header);

        for &stage in BootTimeStage::ALL.iter() {
            let mut row = vec![stage.to_string()];
            row.extend(
                RetrievalMethod::ALL
                    .iter()
                    .map(|&method| display_cell(self.reported(stage, method))),
            );
            row.push(display_cell(self.overall(stage)));
            rows.push(row);
        }
        rows
    }
}

impl FromIterator<((BootTimeStage, RetrievalMethod), Duration)> for BootTimeRecord {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = ((BootTimeStage, RetrievalMethod), Duration)>,
    {
        let mut values: BTreeMap<_, BTreeMap<_, _>> = BTreeMap::new();
        for ((stage, method), duration) in iter {
            values.entry(stage).or_default().insert(method, duration);
        }
        BootTimeRecord { values }
    }
}

// =============================================================================
// Private Implementation
// =============================================================================

fn display_cell(value: Option<Duration>) -> String {
    value.map_or_else(|| "-".to_string(), format_duration)
}

/// On-disk shape of a record: stage name -> method name -> nanoseconds.
///
/// Keys that do not name a known stage or method are dropped when reading,
/// so that history files written by newer versions can still be averaged.
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
struct WireRecord(BTreeMap<String, BTreeMap<String, u64>>);

impl From<WireRecord> for BootTimeRecord {
    fn from(wire: WireRecord) -> Self {
        wire.0
            .into_iter()
            .filter_map(|(stage, methods)| Some((stage.parse::<BootTimeStage>().ok()?, methods)))
            .flat_map(|(stage, methods)| {
                methods.into_iter().filter_map(move |(method, nanos)| {
                    let method = method.parse::<RetrievalMethod>().ok()?;
                    Some(((stage, method), Duration::from_nanos(nanos)))
                })
            })
            .collect()
    }
}

impl From<BootTimeRecord> for WireRecord {
    fn from(record: BootTimeRecord) -> Self {
        let mut wire: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();
        for (stage, method, duration) in record.cells() {
            // Readers reject durations past u64 nanoseconds (about 584
            // years); anything built by hand past that is saturated.
            wire.entry(stage.to_string()).or_default().insert(
                method.to_string(),
                u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX),
            );
        }
        WireRecord(wire)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
