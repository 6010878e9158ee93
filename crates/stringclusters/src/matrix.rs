use snafu::prelude::*;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum MatrixError {
    #[snafu(display("similarity matrix is empty"))]
    Empty,

    #[snafu(display("row {row} has {len} entries, expected {expected}"))]
    NotSquare {
        row: usize,
        len: usize,
        expected: usize,
    },

    #[snafu(display("buffer length {len} is not a perfect square"))]
    BufferNotSquare { len: usize },

    #[snafu(display("entry ({row}, {col}) is not finite: {value}"))]
    NonFinite { row: usize, col: usize, value: f64 },

    #[snafu(display(
        "entry ({row}, {col}) is out of range: |{value}| exceeds {MAX_ABS_SIMILARITY:e}"
    ))]
    OutOfRange { row: usize, col: usize, value: f64 },
}

/// Largest accepted magnitude of a similarity. Messages are sums and
/// differences of up to `n` similarities, which stay finite below this.
pub const MAX_ABS_SIMILARITY: f64 = 1e150;

fn check_value(row: usize, col: usize, value: f64) -> Result<(), MatrixError> {
    ensure!(value.is_finite(), NonFiniteSnafu { row, col, value });
    ensure!(
        value.abs() <= MAX_ABS_SIMILARITY,
        OutOfRangeSnafu { row, col, value }
    );
    Ok(())
}

/// A square matrix of pairwise similarities, stored row-major.
///
/// `get(i, j)` is how well-suited item `j` is to be the exemplar of item `i`.
/// The diagonal holds the preferences. Every entry is finite and at most
/// [`MAX_ABS_SIMILARITY`] in magnitude; the constructors reject anything else.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    n: usize,
    values: Vec<f64>,
}

impl SimilarityMatrix {
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, MatrixError> {
        let n = rows.len();
        ensure!(n > 0, EmptySnafu);

        let mut values = Vec::with_capacity(n * n);
        for (row, r) in rows.iter().enumerate() {
            let r = r.as_ref();
            ensure!(
                r.len() == n,
                NotSquareSnafu {
                    row,
                    len: r.len(),
                    expected: n
                }
            );
            values.extend_from_slice(r);
        }

        Self::checked(n, values)
    }

    /// Builds a matrix from a row-major buffer of `n * n` values.
    pub fn from_flat(values: Vec<f64>) -> Result<Self, MatrixError> {
        ensure!(!values.is_empty(), EmptySnafu);

        let n = values.len().isqrt();
        ensure!(
            n * n == values.len(),
            BufferNotSquareSnafu { len: values.len() }
        );

        Self::checked(n, values)
    }

    pub fn from_fn(n: usize, f: impl Fn(usize, usize) -> f64) -> Result<Self, MatrixError> {
        ensure!(n > 0, EmptySnafu);

        let values = (0..n * n).map(|idx| f(idx / n, idx % n)).collect();
        Self::checked(n, values)
    }

    fn checked(n: usize, values: Vec<f64>) -> Result<Self, MatrixError> {
        debug_assert_eq!(values.len(), n * n);

        for (idx, &value) in values.iter().enumerate() {
            check_value(idx / n, idx % n, value)?;
        }

        Ok(Self { n, values })
    }

    /// Applies `f` to every entry. Callers guarantee that `f` keeps entries finite.
    pub(crate) fn map(&self, mut f: impl FnMut(usize, usize, f64) -> f64) -> Self {
        let n = self.n;
        let values = self
            .values
            .iter()
            .enumerate()
            .map(|(idx, &v)| f(idx / n, idx % n, v))
            .collect();
        Self { n, values }
    }

    /// Number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.n + j]
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.n..(i + 1) * self.n]
    }

    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[f64]> {
        self.values.chunks_exact(self.n)
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub fn preference(&self, i: usize) -> f64 {
        self.get(i, i)
    }

    /// Median of all n² entries, diagonal included. An even count takes the
    /// mean of the two middle values.
    pub fn median(&self) -> f64 {
        let mut sorted = self.values.clone();
        sorted.sort_unstable_by(f64::total_cmp);

        let mid = sorted.len() / 2;
        if sorted.len().is_multiple_of(2) {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        }
    }

    pub fn minimum(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Returns a copy whose diagonal is replaced according to `preference`.
    pub fn with_preference(&self, preference: Preference) -> Result<Self, MatrixError> {
        let value = match preference {
            Preference::Diagonal => return Ok(self.clone()),
            Preference::Median => self.median(),
            Preference::Minimum => self.minimum(),
            Preference::Value(value) => value,
        };
        check_value(0, 0, value)?;

        Ok(self.map(|i, j, v| if i == j { value } else { v }))
    }

    /// If every off-diagonal entry shares one value and every preference
    /// shares another, returns `(similarity, preference)`.
    pub(crate) fn uniform_values(&self) -> Option<(f64, f64)> {
        if self.n < 2 {
            return None;
        }

        let similarity = self.get(0, 1);
        let preference = self.get(0, 0);
        for i in 0..self.n {
            for (j, &v) in self.row(i).iter().enumerate() {
                let expected = if i == j { preference } else { similarity };
                if v != expected {
                    return None;
                }
            }
        }

        Some((similarity, preference))
    }
}

/// How the diagonal of a similarity matrix is chosen before clustering.
///
/// Higher preferences yield more clusters.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum Preference {
    /// Keep the diagonal supplied by the caller.
    Diagonal,
    /// Median of the input similarities.
    #[default]
    Median,
    /// Smallest input similarity, which tends to produce few clusters.
    Minimum,
    Value(f64),
}

impl fmt::Display for Preference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preference::Diagonal => f.write_str("diagonal"),
            Preference::Median => f.write_str("median"),
            Preference::Minimum => f.write_str("minimum"),
            Preference::Value(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(display(
    "unknown preference {input:?}, expected diagonal, median, minimum or a number"
))]
pub struct ParsePreferenceError {
    input: String,
}

impl FromStr for Preference {
    type Err = ParsePreferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "diagonal" => Ok(Preference::Diagonal),
            "median" => Ok(Preference::Median),
            "minimum" | "min" => Ok(Preference::Minimum),
            other => other
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Preference::Value)
                .context(ParsePreferenceSnafu { input: s }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn from_rows_keeps_row_major_layout() {
        let m = SimilarityMatrix::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(m.get(1, 0), 3.0);
        assert_eq!(m.row(1), &[3.0, 4.0]);
        assert_eq!(m.preference(1), 4.0);
    }

    #[test]
    fn empty_matrix() {
        let rows: [Vec<f64>; 0] = [];
        let err = SimilarityMatrix::from_rows(&rows).unwrap_err();
        assert!(matches!(err, MatrixError::Empty));
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn ragged_rows() {
        let rows = vec![vec![0.0, 1.0], vec![1.0]];
        let err = SimilarityMatrix::from_rows(&rows).unwrap_err();
        assert!(matches!(
            err,
            MatrixError::NotSquare {
                row: 1,
                len: 1,
                expected: 2
            }
        ));
    }

    #[test]
    fn rectangular_rows() {
        let rows = vec![vec![0.0, 1.0, 2.0], vec![1.0, 0.0, 2.0]];
        assert!(SimilarityMatrix::from_rows(&rows).is_err());
    }

    #[test]
    fn nan_is_rejected_with_position() {
        let err = SimilarityMatrix::from_rows(&[[0.0, 1.0], [f64::NAN, 0.0]]).unwrap_err();
        assert!(matches!(err, MatrixError::NonFinite { row: 1, col: 0, .. }));
    }

    #[test]
    fn infinity_is_rejected() {
        let err = SimilarityMatrix::from_fn(3, |i, j| {
            if (i, j) == (2, 1) {
                f64::NEG_INFINITY
            } else {
                0.0
            }
        })
        .unwrap_err();
        assert!(matches!(err, MatrixError::NonFinite { row: 2, col: 1, .. }));
    }

    #[test]
    fn huge_entries_are_rejected() {
        let huge = 1.7e308;
        let err = SimilarityMatrix::from_rows(&[
            [-huge, huge, -huge],
            [huge, -huge, huge],
            [-huge, huge, -huge],
        ])
        .unwrap_err();
        assert!(matches!(err, MatrixError::OutOfRange { row: 0, col: 0, .. }));

        let err = SimilarityMatrix::from_flat(vec![0.0, -1e151, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, MatrixError::OutOfRange { row: 0, col: 1, .. }));

        let at_limit = SimilarityMatrix::from_fn(2, |_, _| -MAX_ABS_SIMILARITY);
        assert!(at_limit.is_ok());
    }

    #[test]
    fn flat_buffer_must_be_square() {
        assert!(matches!(
            SimilarityMatrix::from_flat(vec![0.0; 5]).unwrap_err(),
            MatrixError::BufferNotSquare { len: 5 }
        ));
        assert!(matches!(
            SimilarityMatrix::from_flat(vec![]).unwrap_err(),
            MatrixError::Empty
        ));
        assert_eq!(SimilarityMatrix::from_flat(vec![0.0; 9]).unwrap().len(), 3);
    }

    #[test]
    fn median_odd_and_even() {
        let odd = SimilarityMatrix::from_rows(&[[5.0]]).unwrap();
        assert_eq!(odd.median(), 5.0);

        let even = SimilarityMatrix::from_rows(&[[0.0, -4.0], [-1.0, -2.0]]).unwrap();
        // sorted: -4, -2, -1, 0
        assert_eq!(even.median(), -1.5);
    }

    #[test]
    fn with_preference_only_touches_diagonal() {
        let m = SimilarityMatrix::from_rows(&[[0.0, -4.0], [-1.0, 0.0]]).unwrap();

        let median = m.with_preference(Preference::Median).unwrap();
        assert_eq!(median.as_slice(), &[-0.5, -4.0, -1.0, -0.5]);

        let min = m.with_preference(Preference::Minimum).unwrap();
        assert_eq!(min.as_slice(), &[-4.0, -4.0, -1.0, -4.0]);

        let fixed = m.with_preference(Preference::Value(-7.0)).unwrap();
        assert_eq!(fixed.as_slice(), &[-7.0, -4.0, -1.0, -7.0]);

        assert_eq!(m.with_preference(Preference::Diagonal).unwrap(), m);
    }

    #[test]
    fn with_preference_rejects_nan() {
        let m = SimilarityMatrix::from_rows(&[[0.0]]).unwrap();
        assert!(m.with_preference(Preference::Value(f64::NAN)).is_err());
    }

    #[test]
    fn with_preference_rejects_huge_values() {
        let m = SimilarityMatrix::from_rows(&[[0.0, -1.0], [-1.0, 0.0]]).unwrap();
        let err = m.with_preference(Preference::Value(-1e200)).unwrap_err();
        assert!(matches!(err, MatrixError::OutOfRange { row: 0, col: 0, .. }));
    }

    #[test]
    fn uniform_detection() {
        let uniform = SimilarityMatrix::from_fn(4, |i, j| if i == j { -3.0 } else { -1.0 }).unwrap();
        assert_eq!(uniform.uniform_values(), Some((-1.0, -3.0)));

        let uneven_diagonal =
            SimilarityMatrix::from_fn(3, |i, j| if i == j { -(i as f64) } else { -1.0 }).unwrap();
        assert_eq!(uneven_diagonal.uniform_values(), None);

        let single = SimilarityMatrix::from_rows(&[[1.0]]).unwrap();
        assert_eq!(single.uniform_values(), None);
    }

    #[test]
    fn parse_preference() {
        assert_eq!("median".parse::<Preference>().unwrap(), Preference::Median);
        assert_eq!("MIN".parse::<Preference>().unwrap(), Preference::Minimum);
        assert_eq!(
            "diagonal".parse::<Preference>().unwrap(),
            Preference::Diagonal
        );
        assert_eq!(
            "-2.5".parse::<Preference>().unwrap(),
            Preference::Value(-2.5)
        );
        assert!("nan".parse::<Preference>().is_err());
        assert!("largest".parse::<Preference>().is_err());
    }
}
