use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use snafu::Report;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use stringclusters::similarity::WordVectors;
use stringclusters::strings::{Metric, StringClusters};
use stringclusters::{AffinityPropagationOptions, SimilarityMatrix};

fn value_error<E: std::error::Error + 'static>(e: E) -> PyErr {
    PyValueError::new_err(Report::from_error(e).to_string())
}

/// Returns `(assignments, converged)` for a square similarity matrix.
#[pyfunction]
#[pyo3(signature = (similarities, damping=0.5, max_iterations=200, convergence_window=15))]
fn affinity_propagation(
    py: Python<'_>,
    similarities: Vec<Vec<f64>>,
    damping: f64,
    max_iterations: usize,
    convergence_window: usize,
) -> PyResult<(Vec<usize>, bool)> {
    let options = AffinityPropagationOptions {
        damping,
        max_iterations,
        convergence_window,
        ..Default::default()
    };

    let clustering = py.allow_threads(|| {
        let matrix = SimilarityMatrix::from_rows(&similarities).map_err(value_error)?;
        stringclusters::cluster_extra(&matrix, &options).map_err(value_error)
    })?;

    Ok((clustering.assignments, clustering.converged))
}

/// Clusters strings, returning `({exemplar: [members]}, converged)`.
///
/// The euclidean metric needs `vectors`, a GloVe or word2vec text file.
#[pyfunction]
#[pyo3(signature = (strings, metric="edit", vectors=None))]
fn cluster_strings(
    py: Python<'_>,
    strings: Vec<String>,
    metric: &str,
    vectors: Option<PathBuf>,
) -> PyResult<(BTreeMap<String, Vec<String>>, bool)> {
    let metric: Metric = metric.parse().map_err(value_error)?;
    let result = py.allow_threads(|| {
        let mut clusters = StringClusters::new();
        if let Some(path) = &vectors {
            let vectors = WordVectors::from_path(path).map_err(value_error)?;
            clusters = clusters.with_embeddings(Arc::new(vectors));
        }
        clusters
            .compare_and_cluster(&strings, metric)
            .map_err(value_error)
    })?;
    Ok((result.clusters, result.converged))
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(affinity_propagation, m)?)?;
    m.add_function(wrap_pyfunction!(cluster_strings, m)?)?;
    Ok(())
}
