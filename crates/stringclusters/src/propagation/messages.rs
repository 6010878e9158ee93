use crate::matrix::SimilarityMatrix;
use rayon::prelude::*;

/// Responsibility and availability matrices, row-major, both n×n.
///
/// Row updates run in parallel; every worker owns whole output rows and only
/// reads the similarity matrix and the other message matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Messages {
    n: usize,
    responsibilities: Vec<f64>,
    availabilities: Vec<f64>,
}

#[inline(always)]
fn damp(old: f64, new: f64, damping: f64) -> f64 {
    damping * old + (1.0 - damping) * new
}

/// Largest and second largest `a + s` of a row, with the index of the largest
/// (lowest index on ties).
#[inline(always)]
fn top_two(a_row: &[f64], s_row: &[f64]) -> (usize, f64, f64) {
    let mut best = 0;
    let mut first = f64::NEG_INFINITY;
    let mut second = f64::NEG_INFINITY;

    for (k, (&a, &s)) in a_row.iter().zip(s_row).enumerate() {
        let v = a + s;
        if v > first {
            second = first;
            first = v;
            best = k;
        } else if v > second {
            second = v;
        }
    }

    (best, first, second)
}

#[inline(always)]
fn argmax_sum(a_row: &[f64], r_row: &[f64]) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (k, (&a, &r)) in a_row.iter().zip(r_row).enumerate() {
        let v = a + r;
        if v > best_value {
            best_value = v;
            best = k;
        }
    }
    best
}

impl Messages {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            responsibilities: vec![0.0; n * n],
            availabilities: vec![0.0; n * n],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    #[inline]
    pub fn responsibility(&self, i: usize, j: usize) -> f64 {
        self.responsibilities[i * self.n + j]
    }

    #[inline]
    pub fn availability(&self, i: usize, j: usize) -> f64 {
        self.availabilities[i * self.n + j]
    }

    pub fn responsibilities(&self) -> &[f64] {
        &self.responsibilities
    }

    pub fn availabilities(&self) -> &[f64] {
        &self.availabilities
    }

    /// r(i,j) = s(i,j) - max_{k != j} (a(i,k) + s(i,k)), damped.
    pub fn update_responsibilities(&mut self, similarities: &SimilarityMatrix, damping: f64) {
        let n = self.n;
        assert_eq!(similarities.len(), n);
        assert!(n >= 2);

        let Messages {
            responsibilities,
            availabilities,
            ..
        } = self;

        responsibilities
            .par_chunks_mut(n)
            .zip(availabilities.par_chunks(n))
            .zip(similarities.as_slice().par_chunks(n))
            .for_each(|((r_row, a_row), s_row)| {
                let (best, first, second) = top_two(a_row, s_row);
                for (j, (r, &s)) in r_row.iter_mut().zip(s_row).enumerate() {
                    let competing = if j == best { second } else { first };
                    *r = damp(*r, s - competing, damping);
                }
            });
    }

    /// a(i,j) = min(0, r(j,j) + sum_{k != i,j} max(0, r(k,j))) off the diagonal,
    /// a(j,j) = sum_{k != j} max(0, r(k,j)), damped.
    pub fn update_availabilities(&mut self, damping: f64) {
        let n = self.n;
        let Messages {
            responsibilities,
            availabilities,
            ..
        } = self;

        // Summed in row order so that results don't depend on the thread count
        let mut column_sums = vec![0.0f64; n];
        for (k, r_row) in responsibilities.chunks_exact(n).enumerate() {
            for (j, (&r, sum)) in r_row.iter().zip(column_sums.iter_mut()).enumerate() {
                if j != k {
                    *sum += r.max(0.0);
                }
            }
        }

        let self_responsibilities: Vec<f64> =
            (0..n).map(|j| responsibilities[j * n + j]).collect();

        availabilities
            .par_chunks_mut(n)
            .zip(responsibilities.par_chunks(n))
            .enumerate()
            .for_each(|(i, (a_row, r_row))| {
                for (j, a) in a_row.iter_mut().enumerate() {
                    let new = if i == j {
                        column_sums[j]
                    } else {
                        (self_responsibilities[j] + column_sums[j] - r_row[j].max(0.0)).min(0.0)
                    };
                    *a = damp(*a, new, damping);
                }
            });
    }

    /// For every item, the index maximizing a(i,j) + r(i,j).
    pub fn assignments(&self) -> Vec<usize> {
        self.availabilities
            .par_chunks(self.n)
            .zip(self.responsibilities.par_chunks(self.n))
            .map(|(a_row, r_row)| argmax_sum(a_row, r_row))
            .collect()
    }

    /// Items that pick themselves, in ascending order.
    pub fn exemplars(&self) -> Vec<usize> {
        self.assignments()
            .into_iter()
            .enumerate()
            .filter_map(|(i, assigned)| (i == assigned).then_some(i))
            .collect()
    }
}
