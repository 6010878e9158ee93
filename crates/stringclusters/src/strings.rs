//! Clustering and ranking of free-text strings on top of the engine.

use crate::similarity::{EditDistance, EmbeddingModel, EmbeddingSimilarity, SimilarityProvider};
use crate::{
    AffinityPropagationOptions, ClusterError, MatrixError, Preference, SimilarityMatrix,
    cluster_extra,
};
use serde::Serialize;
use snafu::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum StringClustersError {
    #[snafu(display("the euclidean metric needs word vectors"))]
    MissingEmbeddings,

    #[snafu(display("failed to build the similarity matrix"))]
    Similarity { source: MatrixError },

    #[snafu(display("failed to cluster"))]
    Clustering { source: ClusterError },

    #[snafu(display("failed to serialize to JSON"))]
    Json { source: serde_json::Error },
}

/// How strings are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Metric {
    /// Negated Levenshtein distance.
    #[default]
    Edit,
    /// Cosine similarity of word-vector embeddings.
    Euclidean,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Edit => f.write_str("edit"),
            Metric::Euclidean => f.write_str("euclidean"),
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(display("unknown distance metric {input:?}, expected edit or euclidean"))]
pub struct ParseMetricError {
    input: String,
}

impl FromStr for Metric {
    type Err = ParseMetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "edit" => Ok(Metric::Edit),
            "euclidean" => Ok(Metric::Euclidean),
            _ => ParseMetricSnafu { input: s }.fail(),
        }
    }
}

/// Replaces every character that is neither alphanumeric nor whitespace
/// (underscores included) with a space, then collapses and trims whitespace.
pub fn normalize(token: &str) -> String {
    let replaced: String = token
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clusters of normalized strings, keyed by exemplar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenClusters {
    /// Sorted, de-duplicated members of each cluster.
    pub clusters: BTreeMap<String, Vec<String>>,
    pub converged: bool,
    pub iterations: usize,
}

impl TokenClusters {
    /// The clusters map alone, pretty-printed with sorted keys.
    pub fn to_json(&self) -> Result<String, StringClustersError> {
        serde_json::to_string_pretty(&self.clusters).context(JsonSnafu)
    }
}

/// Pretty-prints a ranking from [`StringClusters::similar_terms`] as
/// `[[term, score], ...]`.
pub fn ranking_to_json(ranking: &[(String, f64)]) -> Result<String, StringClustersError> {
    serde_json::to_string_pretty(ranking).context(JsonSnafu)
}

/// Normalizes, compares and clusters strings.
///
/// Edit distance needs nothing else; the euclidean metric needs a shared
/// embedding model, see [`StringClusters::with_embeddings`].
#[derive(Debug, Default)]
pub struct StringClusters {
    embeddings: Option<EmbeddingSimilarity>,
    options: AffinityPropagationOptions,
    preference: Preference,
}

impl StringClusters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_embeddings(mut self, model: Arc<dyn EmbeddingModel>) -> Self {
        self.embeddings = Some(EmbeddingSimilarity::new(model));
        self
    }

    pub fn with_options(mut self, options: AffinityPropagationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_preference(mut self, preference: Preference) -> Self {
        self.preference = preference;
        self
    }

    fn embeddings(&self) -> Result<&EmbeddingSimilarity, StringClustersError> {
        self.embeddings.as_ref().context(MissingEmbeddingsSnafu)
    }

    fn provider(&self, metric: Metric) -> Result<&dyn SimilarityProvider<str>, StringClustersError> {
        let provider: &dyn SimilarityProvider<str> = match metric {
            Metric::Edit => &EditDistance,
            Metric::Euclidean => self.embeddings()?,
        };
        Ok(provider)
    }

    /// Pairwise similarities of `tokens` as given, with the diagonal left
    /// as computed.
    pub fn similarity_matrix<S: AsRef<str> + Sync>(
        &self,
        tokens: &[S],
        metric: Metric,
    ) -> Result<SimilarityMatrix, StringClustersError> {
        match metric {
            Metric::Edit => EditDistance.matrix(tokens),
            Metric::Euclidean => self.embeddings()?.matrix(tokens),
        }
        .context(SimilaritySnafu)
    }

    pub fn compare_and_cluster<S: AsRef<str>>(
        &self,
        tokens: &[S],
        metric: Metric,
    ) -> Result<TokenClusters, StringClustersError> {
        let tokens: Vec<String> = tokens.iter().map(|t| normalize(t.as_ref())).collect();

        let similarities = self
            .similarity_matrix(&tokens, metric)?
            .with_preference(self.preference)
            .context(SimilaritySnafu)?;
        let clustering = cluster_extra(&similarities, &self.options).context(ClusteringSnafu)?;

        // Repeated strings may produce several exemplars with the same text
        let mut clusters: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (exemplar, members) in clustering.cluster_map().iter() {
            clusters
                .entry(tokens[exemplar].clone())
                .or_default()
                .extend(members.iter().map(|&i| tokens[i].clone()));
        }
        for members in clusters.values_mut() {
            members.sort_unstable();
            members.dedup();
        }

        debug!(
            tokens = tokens.len(),
            %metric,
            clusters = clusters.len(),
            converged = clustering.converged,
            "clustered strings"
        );

        Ok(TokenClusters {
            clusters,
            converged: clustering.converged,
            iterations: clustering.iterations,
        })
    }

    /// Ranks the distinct normalized `tokens` by similarity to `term`, most
    /// similar first. Ties keep input order.
    pub fn similar_terms<S: AsRef<str>>(
        &self,
        term: &str,
        tokens: &[S],
        metric: Metric,
    ) -> Result<Vec<(String, f64)>, StringClustersError> {
        let provider = self.provider(metric)?;
        let term = normalize(term);

        let mut seen = HashSet::new();
        let mut ranking: Vec<(String, f64)> = tokens
            .iter()
            .map(|t| normalize(t.as_ref()))
            .filter(|t| seen.insert(t.clone()))
            .map(|t| {
                let score = provider.similarity(&term, &t);
                (t, score)
            })
            .collect();
        ranking.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(ranking)
    }
}
