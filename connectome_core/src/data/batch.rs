//! Fixed-size batching over the training partition.

use ndarray::{Array1, Array3, ArrayView1, ArrayView3, Axis};

/// One contiguous slice of subjects: matrices plus the parallel labels.
pub struct Batch<'a> {
    pub matrices: ArrayView3<'a, f32>,
    pub labels: ArrayView1<'a, u8>,
}

/// Iterates subjects in file order, `batch_size` at a time, no shuffling.
/// The final batch may be short.
pub struct BatchIter<'a> {
    matrices: &'a Array3<f32>,
    labels: &'a Array1<u8>,
    batch_size: usize,
    cursor: usize,
}

impl<'a> Iterator for BatchIter<'a> {
    type Item = Batch<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let total = self.labels.len();
        if self.cursor >= total {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(total);
        let matrices = self.matrices.slice(ndarray::s![self.cursor..end, .., ..]);
        let labels = self.labels.slice(ndarray::s![self.cursor..end]);
        self.cursor = end;
        Some(Batch { matrices, labels })
    }
}

pub fn batches<'a>(
    matrices: &'a Array3<f32>,
    labels: &'a Array1<u8>,
    batch_size: usize,
) -> BatchIter<'a> {
    debug_assert_eq!(matrices.len_of(Axis(0)), labels.len());
    BatchIter {
        matrices,
        labels,
        batch_size: batch_size.max(1),
        cursor: 0,
    }
}

pub fn num_batches(total: usize, batch_size: usize) -> usize {
    let batch_size = batch_size.max(1);
    (total + batch_size - 1) / batch_size
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(subjects: usize) -> (Array3<f32>, Array1<u8>) {
        let matrices = Array3::from_shape_fn((subjects, 2, 2), |(s, i, j)| {
            (s * 4 + i * 2 + j) as f32
        });
        let labels = Array1::from_iter((0..subjects).map(|s| (s % 2) as u8));
        (matrices, labels)
    }

    #[test]
    fn covers_all_subjects_in_order() {
        let (matrices, labels) = fixture(7);
        let collected: Vec<_> = batches(&matrices, &labels, 3).collect();

        assert_eq!(collected.len(), 3);
        assert_eq!(collected[0].labels.len(), 3);
        assert_eq!(collected[1].labels.len(), 3);
        assert_eq!(collected[2].labels.len(), 1);

        // First subject of the second batch is subject 3, untouched.
        assert_eq!(collected[1].matrices[[0, 0, 0]], 12.0);
        assert_eq!(collected[1].labels[0], 1);
    }

    #[test]
    fn num_batches_rounds_up() {
        assert_eq!(num_batches(7, 3), 3);
        assert_eq!(num_batches(6, 3), 2);
        assert_eq!(num_batches(0, 3), 0);
        assert_eq!(num_batches(5, 20), 1);
    }

    #[test]
    fn exact_multiple_has_no_short_batch() {
        let (matrices, labels) = fixture(6);
        let sizes: Vec<_> = batches(&matrices, &labels, 2)
            .map(|b| b.labels.len())
            .collect();
        assert_eq!(sizes, vec![2, 2, 2]);
    }
}
