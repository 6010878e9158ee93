//! Producers of similarity matrices. The clustering engine doesn't depend on
//! anything here; any provider that yields a finite square matrix will do.

use crate::matrix::{MatrixError, SimilarityMatrix};
use rayon::prelude::*;

mod cache;
mod edit;
mod embedding;

pub use cache::VectorCache;
pub use edit::{EditDistance, levenshtein};
pub use embedding::{EmbeddingError, EmbeddingModel, EmbeddingSimilarity, WordVectors, cosine};

pub trait SimilarityProvider<T: ?Sized>: Sync {
    /// How well-suited `b` is to be the exemplar of `a`. Higher is more similar.
    fn similarity(&self, a: &T, b: &T) -> f64;

    /// All pairwise similarities, `matrix.get(i, j) == similarity(items[i], items[j])`.
    /// The diagonal is left as computed; callers usually replace it with a
    /// preference.
    fn matrix<I: AsRef<T> + Sync>(&self, items: &[I]) -> Result<SimilarityMatrix, MatrixError>
    where
        Self: Sized,
    {
        let n = items.len();
        let values = (0..n * n)
            .into_par_iter()
            .map(|idx| self.similarity(items[idx / n].as_ref(), items[idx % n].as_ref()))
            .collect();
        SimilarityMatrix::from_flat(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Length;

    impl SimilarityProvider<str> for Length {
        fn similarity(&self, a: &str, b: &str) -> f64 {
            -(a.len().abs_diff(b.len()) as f64)
        }
    }

    struct Broken;

    impl SimilarityProvider<str> for Broken {
        fn similarity(&self, _: &str, _: &str) -> f64 {
            f64::NAN
        }
    }

    #[test]
    fn default_matrix_is_row_major() {
        let s = Length.matrix(&["a", "abc", "ab"]).unwrap();
        assert_eq!(s.row(0), &[0.0, -2.0, -1.0]);
        assert_eq!(s.row(1), &[-2.0, 0.0, -1.0]);
        assert_eq!(s.row(2), &[-1.0, -1.0, 0.0]);
    }

    #[test]
    fn rejects_empty_and_non_finite() {
        let empty: [&str; 0] = [];
        assert!(matches!(Length.matrix(&empty), Err(MatrixError::Empty)));
        assert!(matches!(
            Broken.matrix(&["a", "b"]),
            Err(MatrixError::NonFinite { row: 0, col: 0, .. })
        ));
    }
}
