//! Flat binary dump of scoring data.
//!
//! Compacts the live, positive slots of a scoring source into three parallel
//! arrays and writes them as `<name>_key1.raw` (voxel, `u32`),
//! `<name>_key2.raw` (spot, `u32`) and `<name>_value.raw` (`f64`). No row
//! grouping, no sorting: entries keep store-iteration order.
//!
//! A destination that cannot be written does not stop the other two; every
//! failure is collected in the returned [`DumpReport`].

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{ExportError, Result};
use crate::raw::{read_raw, write_raw};
use crate::store::{KeyValue, RawSlots, ScoringSource, ScoringStore, SlotFilter, SparseEntry};

/// File suffixes of the three dump arrays.
pub const KEY1_SUFFIX: &str = "_key1.raw";
pub const KEY2_SUFFIX: &str = "_key2.raw";
pub const VALUE_SUFFIX: &str = "_value.raw";

/// Three parallel arrays, one element per surviving entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatDump {
    pub key1: Vec<u32>,
    pub key2: Vec<u32>,
    pub value: Vec<f64>,
}

/// Outcome of writing a dump.
#[derive(Debug, Default)]
pub struct DumpReport {
    /// Number of entries in each array.
    pub entries: usize,
    /// Files written successfully.
    pub written: Vec<PathBuf>,
    /// One error per file that could not be written.
    pub failures: Vec<ExportError>,
}

impl DumpReport {
    /// True if all three files were written.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Paths of the three dump files for `name` in `dir`.
pub fn dump_paths(dir: &Path, name: &str) -> [PathBuf; 3] {
    [
        dir.join(format!("{}{}", name, KEY1_SUFFIX)),
        dir.join(format!("{}{}", name, KEY2_SUFFIX)),
        dir.join(format!("{}{}", name, VALUE_SUFFIX)),
    ]
}

impl FlatDump {
    /// Compact the live, positive entries of `source`, scaling each value.
    pub fn from_source<S: ScoringSource + ?Sized>(source: &S, scale: f64) -> Self {
        let mut dump = Self::default();
        for entry in source.entries(SlotFilter::LivePositive) {
            dump.key1.push(entry.voxel);
            dump.key2.push(entry.spot);
            dump.value.push(entry.value * scale);
        }
        dump
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Iterate the dump as entries.
    pub fn entries(&self) -> impl Iterator<Item = SparseEntry> + '_ {
        self.key1
            .iter()
            .zip(&self.key2)
            .zip(&self.value)
            .map(|((&voxel, &spot), &value)| SparseEntry::new(voxel, spot, value))
    }

    /// Dense store with one slot per dumped entry.
    pub fn into_store(self) -> ScoringStore {
        ScoringStore::from_entries(self.entries())
    }

    /// Write the three files, attempting each one regardless of earlier
    /// failures.
    pub fn write(&self, dir: &Path, name: &str) -> DumpReport {
        let [key1_path, key2_path, value_path] = dump_paths(dir, name);
        let mut report = DumpReport {
            entries: self.len(),
            ..DumpReport::default()
        };

        let results = [
            (key1_path.clone(), write_raw(&key1_path, &self.key1)),
            (key2_path.clone(), write_raw(&key2_path, &self.key2)),
            (value_path.clone(), write_raw(&value_path, &self.value)),
        ];
        for (path, result) in results {
            match result {
                Ok(()) => report.written.push(path),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "cannot write dump file");
                    report.failures.push(e);
                }
            }
        }

        info!(
            dump = name,
            entries = report.entries,
            written = report.written.len(),
            failed = report.failures.len(),
            "flat dump finished"
        );
        report
    }

    /// Read a dump written by [`FlatDump::write`].
    pub fn load(dir: &Path, name: &str) -> Result<Self> {
        let [key1_path, key2_path, value_path] = dump_paths(dir, name);
        let dump = Self {
            key1: read_raw(&key1_path)?,
            key2: read_raw(&key2_path)?,
            value: read_raw(&value_path)?,
        };

        if dump.key1.len() != dump.value.len() || dump.key2.len() != dump.value.len() {
            return Err(ExportError::InvalidInput(format!(
                "dump '{}' has mismatched lengths: key1 {}, key2 {}, value {}",
                name,
                dump.key1.len(),
                dump.key2.len(),
                dump.value.len()
            )));
        }
        Ok(dump)
    }
}

/// Dump an owned scoring store.
pub fn dump_store(store: &ScoringStore, scale: f64, dir: &Path, name: &str) -> DumpReport {
    FlatDump::from_source(store, scale).write(dir, name)
}

/// Dump the first `capacity` slots of a slot table materialised elsewhere.
pub fn dump_slots(
    slots: &[KeyValue],
    capacity: usize,
    scale: f64,
    dir: &Path,
    name: &str,
) -> Result<DumpReport> {
    let view = RawSlots::new(slots, capacity)?;
    Ok(FlatDump::from_source(&view, scale).write(dir, name))
}
