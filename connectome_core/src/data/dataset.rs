//! Delimited dataset files: one row per subject.
//!
//! Column 0 is a subject id (ignored), column 1 the binary diagnosis label,
//! columns 2+ the flattened upper-triangular connectivity values.

use std::path::Path;

use ndarray::{Array1, Array2, Axis};

use super::DataError;

/// A partition of subjects: a feature matrix with a parallel label vector.
///
/// Rows are never mutated after oversampling and normalization.
#[derive(Debug)]
pub struct LabeledSet {
    /// `[subjects, features]`
    pub features: Array2<f32>,
    /// `[subjects]`, values 0 or 1
    pub labels: Array1<u8>,
}

impl LabeledSet {
    /// Build a partition, enforcing the row-count invariant.
    pub fn new(features: Array2<f32>, labels: Array1<u8>) -> Result<Self, DataError> {
        if features.nrows() != labels.len() {
            return Err(DataError::RowCount {
                rows: features.nrows(),
                labels: labels.len(),
            });
        }
        Ok(Self { features, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Subjects per class, indexed by label.
    pub fn class_counts(&self) -> [usize; 2] {
        let mut counts = [0usize; 2];
        for &label in self.labels.iter() {
            counts[label as usize] += 1;
        }
        counts
    }

    /// Pool several partitions row-wise, in the given order.
    pub fn concat(sets: &[LabeledSet]) -> Result<LabeledSet, DataError> {
        let first = sets.first().ok_or(DataError::Empty)?;
        let width = first.features.ncols();

        let mut features = Vec::new();
        let mut labels = Vec::new();
        for set in sets {
            if set.features.ncols() != width {
                return Err(DataError::WidthMismatch {
                    expected: width,
                    found: set.features.ncols(),
                });
            }
            features.extend(set.features.iter().copied());
            labels.extend(set.labels.iter().copied());
        }

        let rows = labels.len();
        let features = Array2::from_shape_vec((rows, width), features)
            .expect("row-major copy preserves the matrix shape");
        Ok(LabeledSet {
            features,
            labels: Array1::from_vec(labels),
        })
    }

    /// A copy restricted to the given row indices (duplicates allowed).
    pub fn select_rows(&self, indices: &[usize]) -> LabeledSet {
        let features = self.features.select(Axis(0), indices);
        let labels = self.labels.select(Axis(0), indices);
        LabeledSet { features, labels }
    }
}

/// Load one dataset file.
///
/// Malformed content (ragged rows, non-numeric cells, labels outside {0, 1})
/// propagates as a fatal [`DataError`]; there is no recovery.
pub fn load_dataset<P: AsRef<Path>>(path: P) -> Result<LabeledSet, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path.as_ref())?;

    let mut features: Vec<f32> = Vec::new();
    let mut labels: Vec<u8> = Vec::new();
    let mut width: Option<usize> = None;

    for (row, record) in reader.records().enumerate() {
        // The reader itself rejects ragged rows (unequal lengths).
        let record = record?;
        if record.len() < 3 {
            return Err(DataError::ShortRow {
                row,
                found: record.len(),
            });
        }

        let label: f64 = parse_cell(&record, row, 1)?;
        if label != 0.0 && label != 1.0 {
            return Err(DataError::Label { row, found: label });
        }
        labels.push(label as u8);

        let row_width = record.len() - 2;
        match width {
            None => width = Some(row_width),
            Some(expected) if expected != row_width => {
                return Err(DataError::WidthMismatch {
                    expected,
                    found: row_width,
                })
            }
            Some(_) => {}
        }

        for column in 2..record.len() {
            let value: f64 = parse_cell(&record, row, column)?;
            features.push(value as f32);
        }
    }

    let width = width.ok_or(DataError::Empty)?;
    let rows = labels.len();
    let features = Array2::from_shape_vec((rows, width), features)
        .expect("row-major copy preserves the matrix shape");
    LabeledSet::new(features, Array1::from_vec(labels))
}

fn parse_cell(record: &csv::StringRecord, row: usize, column: usize) -> Result<f64, DataError> {
    record[column].parse().map_err(|err| DataError::Value {
        row,
        column,
        message: format!("{err}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write");
        file
    }

    #[test]
    fn loads_ids_labels_and_features() {
        let file = write_temp("1,0,0.1,0.2,0.3\n2,1,0.4,0.5,0.6\n");
        let set = load_dataset(file.path()).unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.features.dim(), (2, 3));
        assert_eq!(set.labels.to_vec(), vec![0, 1]);
        // Column 0 (the id) never reaches the feature matrix.
        assert!((set.features[[0, 0]] - 0.1).abs() < 1e-6);
        assert!((set.features[[1, 2]] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn rejects_non_binary_labels() {
        let file = write_temp("1,2,0.1,0.2\n");
        let err = load_dataset(file.path()).unwrap_err();
        assert!(matches!(err, DataError::Label { row: 0, .. }));
    }

    #[test]
    fn rejects_non_numeric_cells() {
        let file = write_temp("1,0,abc,0.2\n");
        let err = load_dataset(file.path()).unwrap_err();
        assert!(matches!(err, DataError::Value { row: 0, column: 2, .. }));
    }

    #[test]
    fn rejects_ragged_rows() {
        let file = write_temp("1,0,0.1,0.2\n2,1,0.3\n");
        assert!(load_dataset(file.path()).is_err());
    }

    #[test]
    fn rejects_empty_files() {
        let file = write_temp("");
        let err = load_dataset(file.path()).unwrap_err();
        assert!(matches!(err, DataError::Empty));
    }

    #[test]
    fn concat_pools_rows_in_order() {
        let a = LabeledSet::new(
            Array2::from_shape_vec((1, 2), vec![1.0, 2.0]).unwrap(),
            Array1::from_vec(vec![0]),
        )
        .unwrap();
        let b = LabeledSet::new(
            Array2::from_shape_vec((2, 2), vec![3.0, 4.0, 5.0, 6.0]).unwrap(),
            Array1::from_vec(vec![1, 1]),
        )
        .unwrap();

        let pooled = LabeledSet::concat(&[a, b]).unwrap();
        assert_eq!(pooled.len(), 3);
        assert_eq!(pooled.labels.to_vec(), vec![0, 1, 1]);
        assert!((pooled.features[[2, 1]] - 6.0).abs() < 1e-6);
    }

    #[test]
    fn concat_rejects_mismatched_widths() {
        let a = LabeledSet::new(
            Array2::from_shape_vec((1, 2), vec![1.0, 2.0]).unwrap(),
            Array1::from_vec(vec![0]),
        )
        .unwrap();
        let b = LabeledSet::new(
            Array2::from_shape_vec((1, 3), vec![3.0, 4.0, 5.0]).unwrap(),
            Array1::from_vec(vec![1]),
        )
        .unwrap();

        assert!(matches!(
            LabeledSet::concat(&[a, b]),
            Err(DataError::WidthMismatch { expected: 2, found: 3 })
        ));
    }

    #[test]
    fn class_counts_tally_labels() {
        let set = LabeledSet::new(
            Array2::zeros((4, 2)),
            Array1::from_vec(vec![0, 1, 1, 1]),
        )
        .unwrap();
        assert_eq!(set.class_counts(), [1, 3]);
    }
}
