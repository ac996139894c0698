//! Tests for the CSR export variants.

use super::*;
use crate::archive::{load_csr, NpzWriter};
use crate::csr::RowOrder;
use crate::mask::IndexMask;
use crate::store::{KeyValue, RawSlots, ScoringStore, EMPTY_KEY};
use tempfile::TempDir;

/// Capacity 4: two live positive entries, one zero-valued, one unused slot.
fn scenario_store() -> ScoringStore {
    ScoringStore::from_slots(&[
        KeyValue::new(0, 0, 2.0),
        KeyValue::new(1, 0, 0.0),
        KeyValue::new(2, 1, 3.0),
        KeyValue::EMPTY,
    ])
}

/// Deterministic pseudo-random slot table with duplicates-free (voxel, spot) keys.
fn scattered_store(volume_size: u32, num_spots: u32) -> ScoringStore {
    let mut slots = Vec::new();
    let mut state = 0x2545_f491u32;
    for voxel in 0..volume_size {
        for spot in 0..num_spots {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            match state % 4 {
                0 => slots.push(KeyValue::EMPTY),
                1 => {}
                _ => slots.push(KeyValue::new(voxel, spot, (state % 1000) as f64 / 100.0 + 0.01)),
            }
        }
    }
    // Scramble slot order the way open addressing does
    let len = slots.len();
    for i in 0..len {
        slots.swap(i, (i * 7 + 3) % len);
    }
    ScoringStore::from_slots(&slots)
}

// ========================================================================
// Spot-major tests
// ========================================================================

#[test]
fn test_spot_major_scenario() {
    let layout = SpotMajor::new(VolumeDims::new(3, 1, 1), 2, 2.0).unwrap();
    let csr = build_csr(&layout, &scenario_store()).unwrap();

    assert_eq!(csr.shape, (2, 3));
    assert_eq!(csr.indptr, vec![0, 1, 2]);
    assert_eq!(csr.row(0), (&[0u32][..], &[4.0][..]));
    assert_eq!(csr.row(1), (&[2u32][..], &[6.0][..]));
    csr.validate(RowOrder::Any).unwrap();
}

#[test]
fn test_spot_major_offsets_cover_all_live_entries() {
    let store = scattered_store(40, 6);
    let layout = SpotMajor::new(VolumeDims::new(4, 5, 2), 6, 1.0).unwrap();
    let csr = build_csr(&layout, &store).unwrap();

    let live = store.entries(SlotFilter::LivePositive).count();
    assert_eq!(csr.indptr.len(), 7);
    assert_eq!(csr.indptr[0], 0);
    assert_eq!(csr.indptr[6] as usize, live);
    assert!(csr.indptr.windows(2).all(|w| w[0] <= w[1]));
    assert!(csr.indices.iter().all(|&v| v < 40));
    csr.validate(RowOrder::Any).unwrap();
}

#[test]
fn test_spot_major_keeps_store_order_within_row() {
    let store = ScoringStore::from_slots(&[
        KeyValue::new(5, 0, 1.0),
        KeyValue::new(1, 0, 2.0),
        KeyValue::new(3, 0, 3.0),
    ]);
    let layout = SpotMajor::new(VolumeDims::new(6, 1, 1), 1, 1.0).unwrap();
    let csr = build_csr(&layout, &store).unwrap();
    assert_eq!(csr.indices, vec![5, 1, 3]);
}

#[test]
fn test_spot_major_rejects_voxel_outside_volume() {
    let store = ScoringStore::from_slots(&[KeyValue::new(0, 0, 1.0), KeyValue::new(3, 0, 1.0)]);
    let layout = SpotMajor::new(VolumeDims::new(3, 1, 1), 1, 1.0).unwrap();

    let err = build_csr(&layout, &store).unwrap_err();
    assert!(matches!(
        err,
        ExportError::VoxelOutOfRange {
            voxel: 3,
            volume_size: 3
        }
    ));
    assert!(err.is_fatal());
}

#[test]
fn test_spot_major_rejects_spot_outside_range() {
    let store = ScoringStore::from_slots(&[KeyValue::new(0, 2, 1.0)]);
    let layout = SpotMajor::new(VolumeDims::new(3, 1, 1), 2, 1.0).unwrap();

    assert!(matches!(
        build_csr(&layout, &store),
        Err(ExportError::SpotOutOfRange {
            spot: 2,
            num_spots: 2
        })
    ));
}

#[test]
fn test_scale_roundtrip() {
    let store = scattered_store(12, 3);
    let dims = VolumeDims::new(12, 1, 1);
    let plain = build_csr(&SpotMajor::new(dims, 3, 1.0).unwrap(), &store).unwrap();

    for scale in [0.5, 3.0, 1.0e-6, 7.25e4] {
        let scaled = build_csr(&SpotMajor::new(dims, 3, scale).unwrap(), &store).unwrap();
        assert_eq!(scaled.indices, plain.indices);
        for (s, p) in scaled.data.iter().zip(&plain.data) {
            assert!((s / scale - p).abs() <= 1e-12 * p.abs().max(1.0));
        }
    }
}

#[test]
fn test_raw_slots_source_matches_store() {
    let slots = vec![
        KeyValue::new(0, 0, 2.0),
        KeyValue::new(1, 0, 0.0),
        KeyValue::new(2, 1, 3.0),
        KeyValue::EMPTY,
        KeyValue::new(1, 1, 9.0),
    ];
    let layout = SpotMajor::new(VolumeDims::new(3, 1, 1), 2, 2.0).unwrap();

    let from_view = build_csr(&layout, &RawSlots::new(&slots, 4).unwrap()).unwrap();
    let from_store = build_csr(&layout, &scenario_store()).unwrap();
    assert_eq!(from_view, from_store);
}

// ========================================================================
// Voxel-major masked tests
// ========================================================================

#[test]
fn test_masked_excludes_voxels_outside_region() {
    // voxel 2 is excluded; voxels 0, 1, 3 compact to rows 0, 1, 2
    let mask = IndexMask::from_table(vec![0, 1, -1, 2]);
    let store = ScoringStore::from_slots(&[
        KeyValue::new(0, 1, 1.0),
        KeyValue::new(2, 0, 5.0),
        KeyValue::new(3, 0, 2.0),
        KeyValue::new(2, 1, 5.0),
    ]);
    let layout = VoxelMajorMasked::new(&mask, 2, 1.0);
    let csr = build_csr(&layout, &store).unwrap();

    assert_eq!(csr.shape, (3, 2));
    assert_eq!(csr.rows(), mask.mask_size());
    assert_eq!(csr.indptr, vec![0, 1, 1, 2]);
    assert!(!csr.data.contains(&5.0));
    assert_eq!(csr.row(2), (&[0u32][..], &[2.0][..]));
}

#[test]
fn test_masked_rows_are_strictly_ascending() {
    let store = scattered_store(30, 8);
    let voxels: Vec<u32> = (0..30).filter(|v| v % 3 != 0).collect();
    let mask = IndexMask::from_voxels(30, &voxels).unwrap();
    let layout = VoxelMajorMasked::new(&mask, 8, 1.0);

    let csr = build_csr(&layout, &store).unwrap();

    assert_eq!(csr.rows(), 20);
    csr.validate(RowOrder::StrictlyAscending).unwrap();
    let expected = store
        .entries(SlotFilter::LivePositive)
        .filter(|e| e.voxel % 3 != 0)
        .count();
    assert_eq!(csr.nnz(), expected);
}

#[test]
fn test_masked_sort_carries_values() {
    let mask = IndexMask::from_table(vec![0]);
    let store = ScoringStore::from_slots(&[
        KeyValue::new(0, 4, 4.0),
        KeyValue::new(0, 1, 1.0),
        KeyValue::EMPTY,
        KeyValue::new(0, 3, 3.0),
    ]);
    let csr = build_csr(&VoxelMajorMasked::new(&mask, 5, 0.5), &store).unwrap();

    assert_eq!(csr.indices, vec![1, 3, 4]);
    assert_eq!(csr.data, vec![0.5, 1.5, 2.0]);
}

#[test]
fn test_masked_rejects_non_positive_scale() {
    let mask = IndexMask::from_table(vec![0, 1]);
    let store = ScoringStore::from_slots(&[KeyValue::new(0, 0, 1.0), KeyValue::new(1, 0, 2.0)]);

    let err = build_csr(&VoxelMajorMasked::new(&mask, 1, -1.0), &store).unwrap_err();
    assert!(matches!(err, ExportError::NonPositiveValue { voxel: 0, .. }));
    assert!(err.is_fatal());

    let err = build_csr(&VoxelMajorMasked::new(&mask, 1, 0.0), &store).unwrap_err();
    assert!(matches!(err, ExportError::NonPositiveValue { .. }));
}

#[test]
fn test_masked_skips_zero_valued_slots() {
    let mask = IndexMask::from_table(vec![0, 1, 2]);
    let layout = VoxelMajorMasked::new(&mask, 2, 2.0);

    let csr = build_csr(&layout, &scenario_store()).unwrap();

    // (1, 0, 0.0) never reaches the matrix
    assert_eq!(csr.shape, (3, 2));
    assert_eq!(csr.indptr, vec![0, 1, 1, 2]);
    assert_eq!(csr.row(0), (&[0u32][..], &[4.0][..]));
    assert_eq!(csr.row(2), (&[1u32][..], &[6.0][..]));
    csr.validate(RowOrder::StrictlyAscending).unwrap();
}

#[test]
fn test_masked_ignores_non_positive_value_outside_region() {
    let mask = IndexMask::from_table(vec![0, -1]);
    let store = ScoringStore::from_slots(&[KeyValue::new(0, 0, 1.0), KeyValue::new(1, 0, 0.0)]);

    let csr = build_csr(&VoxelMajorMasked::new(&mask, 1, 1.0), &store).unwrap();
    assert_eq!(csr.nnz(), 1);
}

#[test]
fn test_masked_rejects_index_beyond_mask_size() {
    struct Broken;
    impl RegionMask for Broken {
        fn mask_size(&self) -> u32 {
            2
        }
        fn mask_index(&self, voxel: u32) -> Option<u32> {
            Some(voxel)
        }
    }

    let store = ScoringStore::from_slots(&[KeyValue::new(5, 0, 1.0)]);
    let err = build_csr(&VoxelMajorMasked::new(&Broken, 1, 1.0), &store).unwrap_err();
    assert!(matches!(
        err,
        ExportError::MaskIndexOutOfRange {
            voxel: 5,
            index: 5,
            mask_size: 2
        }
    ));
}

#[test]
fn test_masked_accepts_trait_object() {
    let mask = IndexMask::from_table(vec![0, 1, 2]);
    let dyn_mask: &dyn RegionMask = &mask;
    let store = scenario_store();

    let csr = build_csr(&VoxelMajorMasked::new(dyn_mask, 2, 1.0), &store).unwrap();
    assert_eq!(csr.nnz(), 2);

    let err = build_csr(&VoxelMajorMasked::new(dyn_mask, 2, -2.0), &store).unwrap_err();
    assert!(matches!(err, ExportError::NonPositiveValue { .. }));
}

/// Routes every entry to row 3 of a one-row matrix.
struct MisroutedLayout;

impl CsrLayout for MisroutedLayout {
    fn label(&self) -> &'static str {
        "misrouted"
    }

    fn filter(&self) -> SlotFilter {
        SlotFilter::LivePositive
    }

    fn shape(&self) -> (u32, u32) {
        (1, 10)
    }

    fn place(&self, entry: &SparseEntry) -> Result<Option<Placed>> {
        Ok(Some(Placed {
            row: 3,
            col: entry.voxel,
            value: entry.value,
        }))
    }
}

#[test]
fn test_build_csr_rejects_cell_outside_layout_shape() {
    let err = build_csr(&MisroutedLayout, &scenario_store()).unwrap_err();
    assert!(matches!(err, ExportError::InvalidCsr(_)));
}

// ========================================================================
// Time-normalised tests
// ========================================================================

#[test]
fn test_time_normalized_values() {
    let store = ScoringStore::from_slots(&[
        KeyValue::new(0, 0, 1.0),
        KeyValue::new(1, 0, 3.0),
        KeyValue::new(2, 1, 0.5),
        KeyValue::new(3, 1, 5.0),
        KeyValue::EMPTY,
    ]);
    let time_scale = [2.0, 0.5];
    let layout = TimeNormalized::new(VolumeDims::new(4, 1, 1), 2, 2.0, 1.0, &time_scale).unwrap();

    let csr = build_csr(&layout, &store).unwrap();

    assert_eq!(csr.indptr, vec![0, 2, 4]);
    // spot 0: 1.0*2 - 2 = 0 -> 0; 3.0*2 - 2 = 4 -> 4 / 2
    assert_eq!(csr.row(0), (&[0u32, 1][..], &[0.0, 2.0][..]));
    // spot 1: 0.5*2 - 2 < 0 -> 0; 5.0*2 - 2 = 8 -> 8 / 0.5
    assert_eq!(csr.row(1), (&[2u32, 3][..], &[0.0, 16.0][..]));
}

#[test]
fn test_time_normalized_keeps_zero_valued_slots() {
    let store = ScoringStore::from_slots(&[KeyValue::new(0, 0, 0.0)]);
    let time_scale = [1.0];
    let layout = TimeNormalized::new(VolumeDims::new(1, 1, 1), 1, 1.0, 0.0, &time_scale).unwrap();

    let csr = build_csr(&layout, &store).unwrap();
    assert_eq!(csr.nnz(), 1);
    assert_eq!(csr.data, vec![0.0]);
}

#[test]
fn test_time_normalized_requires_full_time_scale() {
    let time_scale = [1.0];
    let err = TimeNormalized::new(VolumeDims::new(1, 1, 1), 2, 1.0, 0.0, &time_scale).unwrap_err();
    assert!(matches!(
        err,
        ExportError::TimeScaleLength {
            len: 1,
            num_spots: 2
        }
    ));
}

#[test]
fn test_time_normalized_rejects_zero_factor_in_use() {
    let store = ScoringStore::from_slots(&[KeyValue::new(0, 1, 1.0)]);
    // Spot 0 is never scored, so its zero factor is harmless
    let time_scale = [0.0, 0.0];
    let layout = TimeNormalized::new(VolumeDims::new(1, 1, 1), 2, 1.0, 0.0, &time_scale).unwrap();

    assert!(matches!(
        build_csr(&layout, &store),
        Err(ExportError::InvalidTimeScale { spot: 1, .. })
    ));
}

// ========================================================================
// export_csr tests
// ========================================================================

#[test]
fn test_export_csr_writes_archive() {
    let dir = TempDir::new().unwrap();
    let layout = SpotMajor::new(VolumeDims::new(3, 1, 1), 2, 2.0).unwrap();

    let summary = export_csr(&layout, &scenario_store(), &mut NpzWriter, dir.path(), "dij").unwrap();

    assert_eq!(summary.path, dir.path().join("dij.npz"));
    assert_eq!(summary.shape, (2, 3));
    assert_eq!(summary.nnz, 2);

    let loaded = load_csr(&summary.path).unwrap();
    assert_eq!(loaded.indices, vec![0, 2]);
    assert_eq!(loaded.data, vec![4.0, 6.0]);
    assert_eq!(loaded.indptr, vec![0, 1, 2]);
}

#[test]
fn test_export_csr_fatal_error_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let store = ScoringStore::from_slots(&[KeyValue::new(9, 0, 1.0)]);
    let layout = SpotMajor::new(VolumeDims::new(3, 1, 1), 1, 1.0).unwrap();

    let result = export_csr(&layout, &store, &mut NpzWriter, dir.path(), "dij");

    assert!(result.is_err());
    assert!(!dir.path().join("dij.npz").exists());
}

#[test]
fn test_export_csr_empty_store() {
    let dir = TempDir::new().unwrap();
    let store = ScoringStore::from_slots(&[KeyValue::EMPTY, KeyValue::new(EMPTY_KEY, 0, 1.0)]);
    let layout = SpotMajor::new(VolumeDims::new(2, 2, 1), 3, 1.0).unwrap();

    let summary = export_csr(&layout, &store, &mut NpzWriter, dir.path(), "empty").unwrap();
    let loaded = load_csr(&summary.path).unwrap();
    assert_eq!(loaded.indptr, vec![0, 0, 0, 0]);
    assert_eq!(loaded.shape, (3, 4));
}
