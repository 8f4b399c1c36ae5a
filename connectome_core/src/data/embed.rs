//! Upper-triangular embedding.
//!
//! Connectivity files store only the above-diagonal half of each subject's
//! matrix. The embedding scatters that vector back into the upper triangle,
//! mirrors it below the diagonal, and fills the diagonal with ones.

use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, Axis, Zip};

use super::DataError;

/// Number of above-diagonal entries of an `n_node` x `n_node` matrix.
pub fn triangle_len(n_node: usize) -> usize {
    n_node * (n_node - 1) / 2
}

/// Reconstruct one symmetric connectivity matrix with unit diagonal.
///
/// Values fill the upper triangle row by row, left to right. The vector
/// length must equal [`triangle_len`]; anything else is rejected rather
/// than silently misaligned.
pub fn embed_upper_triangular(
    vector: ArrayView1<f32>,
    n_node: usize,
) -> Result<Array2<f32>, DataError> {
    let expected = triangle_len(n_node);
    if vector.len() != expected {
        return Err(DataError::TriangleLength {
            n_node,
            expected,
            found: vector.len(),
        });
    }

    let mut matrix = Array2::<f32>::zeros((n_node, n_node));
    let mut next = 0;
    for i in 0..n_node {
        for j in (i + 1)..n_node {
            matrix[[i, j]] = vector[next];
            next += 1;
        }
    }

    // Mirror into the lower triangle, then the unit diagonal.
    for i in 0..n_node {
        matrix[[i, i]] = 1.0;
        for j in 0..i {
            matrix[[i, j]] = matrix[[j, i]];
        }
    }

    Ok(matrix)
}

/// Extract the above-diagonal entries row by row, left to right.
///
/// Inverse of [`embed_upper_triangular`] for the off-diagonal values.
pub fn upper_triangle(matrix: ArrayView2<f32>) -> Array1<f32> {
    let n = matrix.nrows();
    let mut values = Vec::with_capacity(triangle_len(n));
    for i in 0..n {
        for j in (i + 1)..n {
            values.push(matrix[[i, j]]);
        }
    }
    Array1::from_vec(values)
}

/// Embed every subject row of `features` into its connectivity matrix.
///
/// Returns `[subjects, n_node, n_node]`.
pub fn embed_all(features: &Array2<f32>, n_node: usize) -> Result<Array3<f32>, DataError> {
    let expected = triangle_len(n_node);
    if features.ncols() != expected {
        return Err(DataError::TriangleLength {
            n_node,
            expected,
            found: features.ncols(),
        });
    }

    let mut matrices = Array3::<f32>::zeros((features.nrows(), n_node, n_node));
    Zip::from(matrices.axis_iter_mut(Axis(0)))
        .and(features.axis_iter(Axis(0)))
        .par_for_each(|mut matrix, vector| {
            let mut next = 0;
            for i in 0..n_node {
                for j in (i + 1)..n_node {
                    matrix[[i, j]] = vector[next];
                    next += 1;
                }
            }
            for i in 0..n_node {
                matrix[[i, i]] = 1.0;
                for j in 0..i {
                    let mirrored = matrix[[j, i]];
                    matrix[[i, j]] = mirrored;
                }
            }
        });

    Ok(matrices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn four_node_worked_example() {
        let vector = array![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let matrix = embed_upper_triangular(vector.view(), 4).unwrap();

        let expected = array![
            [1.0f32, 1.0, 2.0, 3.0],
            [1.0, 1.0, 4.0, 5.0],
            [2.0, 4.0, 1.0, 6.0],
            [3.0, 5.0, 6.0, 1.0],
        ];
        assert_eq!(matrix, expected);
    }

    #[test]
    fn diagonal_is_all_ones() {
        let vector = Array1::linspace(-2.0f32, 2.0, triangle_len(7));
        let matrix = embed_upper_triangular(vector.view(), 7).unwrap();
        for i in 0..7 {
            assert_eq!(matrix[[i, i]], 1.0);
        }
    }

    #[test]
    fn result_is_exactly_symmetric() {
        let vector = Array1::linspace(0.0f32, 1.0, triangle_len(9));
        let matrix = embed_upper_triangular(vector.view(), 9).unwrap();
        for i in 0..9 {
            for j in 0..9 {
                assert_eq!(matrix[[i, j]], matrix[[j, i]]);
            }
        }
    }

    #[test]
    fn embedding_then_extraction_is_identity() {
        let vector = Array1::linspace(-1.0f32, 3.0, triangle_len(6));
        let matrix = embed_upper_triangular(vector.view(), 6).unwrap();
        let recovered = upper_triangle(matrix.view());
        assert_eq!(recovered, vector);
    }

    #[test]
    fn rejects_wrong_vector_length() {
        let vector = Array1::<f32>::zeros(5);
        let err = embed_upper_triangular(vector.view(), 4).unwrap_err();
        assert!(matches!(
            err,
            DataError::TriangleLength { n_node: 4, expected: 6, found: 5 }
        ));
    }

    #[test]
    fn embed_all_matches_single_embedding() {
        let features = Array2::from_shape_fn((3, triangle_len(5)), |(r, c)| {
            (r * 10 + c) as f32 * 0.1
        });
        let matrices = embed_all(&features, 5).unwrap();
        assert_eq!(matrices.dim(), (3, 5, 5));

        for subject in 0..3 {
            let single =
                embed_upper_triangular(features.row(subject), 5).unwrap();
            assert_eq!(matrices.index_axis(Axis(0), subject), single);
        }
    }
}
