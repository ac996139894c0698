//! Scoring store: the engine's fixed-capacity (voxel, spot, dose) slot table.
//!
//! The engine scores into an open-addressed table of [`KeyValue`] slots where
//! either key equal to [`EMPTY_KEY`] marks an unused slot. Sentinels are
//! resolved once, at the boundary, into `Option<SparseEntry>`; everything
//! downstream works on live entries only.
//!
//! Both the owned [`ScoringStore`] and a borrowed [`RawSlots`] view implement
//! [`ScoringSource`], which is all the export pipeline needs.

use crate::error::{ExportError, Result};

/// Key value marking an unused slot.
pub const EMPTY_KEY: u32 = u32::MAX;

/// Engine slot layout: `key1` is the voxel index, `key2` the spot index.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyValue {
    pub key1: u32,
    pub key2: u32,
    pub value: f64,
}

impl KeyValue {
    /// An unused slot.
    pub const EMPTY: Self = Self {
        key1: EMPTY_KEY,
        key2: EMPTY_KEY,
        value: 0.0,
    };

    pub const fn new(voxel: u32, spot: u32, value: f64) -> Self {
        Self {
            key1: voxel,
            key2: spot,
            value,
        }
    }

    /// Resolve the slot, `None` if either key is the sentinel.
    #[inline]
    pub fn entry(&self) -> Option<SparseEntry> {
        if self.key1 == EMPTY_KEY || self.key2 == EMPTY_KEY {
            return None;
        }
        Some(SparseEntry {
            voxel: self.key1,
            spot: self.key2,
            value: self.value,
        })
    }
}

impl Default for KeyValue {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// One live scoring triple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparseEntry {
    pub voxel: u32,
    pub spot: u32,
    pub value: f64,
}

impl SparseEntry {
    pub const fn new(voxel: u32, spot: u32, value: f64) -> Self {
        Self { voxel, spot, value }
    }
}

/// Which live slots an export reads.
///
/// Export variants differ here on purpose and each one states its policy
/// explicitly instead of sharing a single filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotFilter {
    /// Every occupied slot, whatever its value.
    Occupied,
    /// Occupied slots with `value > 0`.
    LivePositive,
}

impl SlotFilter {
    #[inline]
    pub fn accepts(self, entry: &SparseEntry) -> bool {
        match self {
            SlotFilter::Occupied => true,
            SlotFilter::LivePositive => entry.value > 0.0,
        }
    }
}

/// Read-only random access to a fixed-capacity slot table.
pub trait ScoringSource {
    /// Number of slots, live or not.
    fn capacity(&self) -> usize;

    /// Resolve slot `index`; `None` for unused slots.
    ///
    /// `index` must be below [`capacity`](Self::capacity).
    fn slot(&self, index: usize) -> Option<SparseEntry>;

    /// Iterate slots in index order, yielding entries accepted by `filter`.
    fn entries(&self, filter: SlotFilter) -> Entries<'_, Self> {
        Entries {
            source: self,
            next: 0,
            filter,
        }
    }
}

/// Iterator over the accepted entries of a [`ScoringSource`].
pub struct Entries<'a, S: ?Sized> {
    source: &'a S,
    next: usize,
    filter: SlotFilter,
}

impl<S: ScoringSource + ?Sized> Iterator for Entries<'_, S> {
    type Item = SparseEntry;

    fn next(&mut self) -> Option<SparseEntry> {
        while self.next < self.source.capacity() {
            let index = self.next;
            self.next += 1;
            if let Some(entry) = self.source.slot(index) {
                if self.filter.accepts(&entry) {
                    return Some(entry);
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.source.capacity() - self.next))
    }
}

/// Owned slot arena with sentinels already resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoringStore {
    slots: Vec<Option<SparseEntry>>,
}

impl ScoringStore {
    /// Store with `capacity` unused slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    /// Snapshot an engine slot table.
    pub fn from_slots(slots: &[KeyValue]) -> Self {
        Self {
            slots: slots.iter().map(KeyValue::entry).collect(),
        }
    }

    /// Dense store holding exactly `entries`, one per slot.
    pub fn from_entries(entries: impl IntoIterator<Item = SparseEntry>) -> Self {
        Self {
            slots: entries.into_iter().map(Some).collect(),
        }
    }

    /// Occupy (or clear) one slot.
    ///
    /// # Panics
    /// Panics if `index >= capacity`.
    pub fn set(&mut self, index: usize, entry: Option<SparseEntry>) {
        self.slots[index] = entry;
    }

    /// Number of occupied slots.
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

impl ScoringSource for ScoringStore {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn slot(&self, index: usize) -> Option<SparseEntry> {
        self.slots[index]
    }
}

impl FromIterator<Option<SparseEntry>> for ScoringStore {
    fn from_iter<I: IntoIterator<Item = Option<SparseEntry>>>(iter: I) -> Self {
        Self {
            slots: iter.into_iter().collect(),
        }
    }
}

/// Borrowed view over a slot table materialised elsewhere.
///
/// Only the first `capacity` slots are read, so a caller can pass a buffer
/// larger than the table it holds.
#[derive(Debug, Clone, Copy)]
pub struct RawSlots<'a> {
    slots: &'a [KeyValue],
}

impl<'a> RawSlots<'a> {
    /// View the first `capacity` slots of `slots`.
    pub fn new(slots: &'a [KeyValue], capacity: usize) -> Result<Self> {
        if capacity > slots.len() {
            return Err(ExportError::CapacityExceedsSlots {
                capacity,
                available: slots.len(),
            });
        }
        Ok(Self {
            slots: &slots[..capacity],
        })
    }
}

impl ScoringSource for RawSlots<'_> {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn slot(&self, index: usize) -> Option<SparseEntry> {
        self.slots[index].entry()
    }
}
