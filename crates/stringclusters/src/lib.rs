#[cfg(feature = "_debug")]
pub mod noise;
#[cfg(not(feature = "_debug"))]
mod noise;
#[cfg(feature = "_debug")]
pub mod propagation;
#[cfg(not(feature = "_debug"))]
mod propagation;

mod clustering;
mod matrix;
mod options;
pub mod similarity;
pub mod strings;

pub use clustering::{ClusterMap, Clustering};
pub use matrix::{
    MAX_ABS_SIMILARITY, MatrixError, ParsePreferenceError, Preference, SimilarityMatrix,
};
pub use options::{
    AffinityPropagationOptions, ConfigError, DEFAULT_CONVERGENCE_WINDOW, DEFAULT_DAMPING,
    DEFAULT_MAX_ITERATIONS,
};
pub use propagation::Cancellation;
pub use propagation::messages::Messages;

use snafu::prelude::*;
use tracing::warn;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum ClusterError {
    #[snafu(display("invalid similarity matrix"))]
    InvalidInput { source: MatrixError },

    #[snafu(display("invalid options"))]
    Configuration { source: ConfigError },

    #[snafu(display("clustering cancelled after {iterations} iterations"))]
    Cancelled { iterations: usize },
}

/// Cluster items by Affinity Propagation over their pairwise similarities,
/// with the default options.
///
/// ```
/// use stringclusters::SimilarityMatrix;
///
/// // Two pairs: similar within, very dissimilar across
/// let s = SimilarityMatrix::from_rows(&[
///     [-5.0, -1.0, -100.0, -100.0],
///     [-1.0, -5.0, -100.0, -100.0],
///     [-100.0, -100.0, -5.0, -1.0],
///     [-100.0, -100.0, -1.0, -5.0],
/// ])
/// .unwrap();
///
/// let clustering = stringclusters::cluster(&s).unwrap();
/// assert_eq!(clustering.assignments, vec![0, 0, 2, 2]);
/// assert_eq!(clustering.exemplars, vec![0, 2]);
/// assert!(clustering.converged);
/// ```
///
/// The diagonal holds the preferences: raising it yields more clusters.
/// [`SimilarityMatrix::with_preference`] replaces it, for example with the
/// median of the similarities. Running out of iterations is not an error;
/// check [`Clustering::converged`].
pub fn cluster(similarities: &SimilarityMatrix) -> Result<Clustering, ClusterError> {
    cluster_extra(similarities, &AffinityPropagationOptions::default())
}

pub fn cluster_extra(
    similarities: &SimilarityMatrix,
    options: &AffinityPropagationOptions,
) -> Result<Clustering, ClusterError> {
    Ok(cluster_extra_debug(similarities, options, None)?.0)
}

/// Like [`cluster_extra`], but stops at the next iteration boundary once
/// `cancellation` is triggered.
pub fn cluster_cancellable(
    similarities: &SimilarityMatrix,
    options: &AffinityPropagationOptions,
    cancellation: &Cancellation,
) -> Result<Clustering, ClusterError> {
    Ok(cluster_extra_debug(similarities, options, Some(cancellation))?.0)
}

/// Convenience wrapper for callers holding nested rows.
pub fn cluster_rows<R: AsRef<[f64]>>(
    rows: &[R],
    options: &AffinityPropagationOptions,
) -> Result<Clustering, ClusterError> {
    let similarities = SimilarityMatrix::from_rows(rows).context(InvalidInputSnafu)?;
    cluster_extra(&similarities, options)
}

#[derive(Debug)]
pub struct DebugInfo {
    /// Final responsibilities and availabilities. `None` when the input was
    /// uniform and no message passing happened.
    pub messages: Option<Messages>,
    /// Number of exemplars after each iteration.
    pub exemplar_counts: Vec<usize>,
}

pub fn cluster_extra_debug(
    similarities: &SimilarityMatrix,
    options: &AffinityPropagationOptions,
    cancellation: Option<&Cancellation>,
) -> Result<(Clustering, DebugInfo), ClusterError> {
    options.validate().context(ConfigurationSnafu)?;

    let outcome = propagation::engine::run(similarities, options, cancellation)
        .map_err(|c| CancelledSnafu {
            iterations: c.iterations,
        }
        .build())?;

    let clustering = Clustering::new(outcome.assignments, outcome.converged, outcome.iterations);
    let inconsistent = clustering.inconsistent_exemplars();
    if !inconsistent.is_empty() {
        warn!(
            ?inconsistent,
            converged = clustering.converged,
            "some exemplars are not assigned to themselves"
        );
    }

    Ok((
        clustering,
        DebugInfo {
            messages: outcome.messages,
            exemplar_counts: outcome.exemplar_counts,
        },
    ))
}
