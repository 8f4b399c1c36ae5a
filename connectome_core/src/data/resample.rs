//! Random oversampling of the minority class.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::dataset::LabeledSet;

/// Duplicate minority-class rows (uniform with replacement, seeded) until
/// both class counts are equal.
///
/// Only ever applied to the training partition; validation data must reach
/// the trainer untouched. A partition that is already balanced, or that
/// contains a single class, is returned as-is.
pub fn oversample(set: &LabeledSet, seed: u64) -> LabeledSet {
    let counts = set.class_counts();
    if counts[0] == counts[1] || counts[0] == 0 || counts[1] == 0 {
        return set.select_rows(&(0..set.len()).collect::<Vec<_>>());
    }

    let minority: u8 = if counts[0] < counts[1] { 0 } else { 1 };
    let deficit = counts[0].abs_diff(counts[1]);

    let minority_rows: Vec<usize> = set
        .labels
        .iter()
        .enumerate()
        .filter(|(_, &label)| label == minority)
        .map(|(row, _)| row)
        .collect();

    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..set.len()).collect();
    for _ in 0..deficit {
        indices.push(minority_rows[rng.gen_range(0..minority_rows.len())]);
    }

    set.select_rows(&indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    fn imbalanced(minority: usize, majority: usize) -> LabeledSet {
        let rows = minority + majority;
        let mut labels = vec![0u8; minority];
        labels.extend(std::iter::repeat(1u8).take(majority));
        let features =
            Array2::from_shape_fn((rows, 3), |(r, c)| (r * 3 + c) as f32);
        LabeledSet::new(features, Array1::from_vec(labels)).unwrap()
    }

    #[test]
    fn equalizes_class_counts() {
        for (minority, majority) in [(1, 9), (3, 7), (5, 11), (2, 2)] {
            let set = imbalanced(minority, majority);
            let resampled = oversample(&set, 0);
            let counts = resampled.class_counts();
            assert_eq!(counts[0], counts[1], "{minority}/{majority} imbalance");
            assert_eq!(resampled.len(), 2 * majority.max(minority));
        }
    }

    #[test]
    fn keeps_original_rows_in_order() {
        let set = imbalanced(2, 5);
        let resampled = oversample(&set, 0);

        // The first len() rows are the originals, untouched.
        for row in 0..set.len() {
            assert_eq!(resampled.labels[row], set.labels[row]);
            for col in 0..3 {
                assert_eq!(resampled.features[[row, col]], set.features[[row, col]]);
            }
        }
    }

    #[test]
    fn appended_rows_are_minority_duplicates() {
        let set = imbalanced(2, 6);
        let resampled = oversample(&set, 7);

        for row in set.len()..resampled.len() {
            assert_eq!(resampled.labels[row], 0);
            // Every duplicate matches one of the two minority originals.
            let matches_original = (0..2).any(|orig| {
                (0..3).all(|col| resampled.features[[row, col]] == set.features[[orig, col]])
            });
            assert!(matches_original);
        }
    }

    #[test]
    fn deterministic_for_a_fixed_seed() {
        let set = imbalanced(3, 8);
        let a = oversample(&set, 42);
        let b = oversample(&set, 42);
        assert_eq!(a.labels.to_vec(), b.labels.to_vec());
        assert_eq!(a.features, b.features);
    }

    #[test]
    fn single_class_partitions_pass_through() {
        let set = LabeledSet::new(Array2::zeros((4, 2)), Array1::from_vec(vec![1, 1, 1, 1]))
            .unwrap();
        let resampled = oversample(&set, 0);
        assert_eq!(resampled.len(), 4);
    }
}
