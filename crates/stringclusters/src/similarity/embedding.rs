use super::SimilarityProvider;
use super::cache::VectorCache;
use crate::matrix::{MatrixError, SimilarityMatrix};
use rayon::prelude::*;
use snafu::prelude::*;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum EmbeddingError {
    #[snafu(display("failed to open word vectors at {}", path.display()))]
    Open { source: io::Error, path: PathBuf },

    #[snafu(display("failed to read word vectors"))]
    Read { source: io::Error },

    #[snafu(display("line {line}: {token:?} is not a number"))]
    Parse { line: usize, token: String },

    #[snafu(display("line {line}: {word:?} has no vector values"))]
    MissingValues { line: usize, word: String },

    #[snafu(display("line {line}: expected {expected} dimensions, found {found}"))]
    DimensionMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[snafu(display("no word vectors found"))]
    NoVectors,
}

/// A read-only embedding service. Loading one is expensive, so it is built
/// once and shared behind an `Arc`.
pub trait EmbeddingModel: Send + Sync {
    fn dimension(&self) -> usize;

    /// Embeds a whole phrase. Always returns `dimension()` values.
    fn embed(&self, phrase: &str) -> Vec<f32>;
}

/// Static word vectors, e.g. GloVe or word2vec in text format.
#[derive(Debug, Clone)]
pub struct WordVectors {
    dimension: usize,
    index: HashMap<String, usize>,
    // Row-major, one row of `dimension` values per word
    values: Vec<f32>,
}

impl WordVectors {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EmbeddingError> {
        let path = path.as_ref();
        let file = File::open(path).context(OpenSnafu { path })?;
        let vectors = Self::from_reader(BufReader::new(file))?;
        debug!(
            path = %path.display(),
            words = vectors.len(),
            dimension = vectors.dimension,
            "loaded word vectors"
        );
        Ok(vectors)
    }

    /// Parses one `word v1 v2 ...` entry per line. A leading `<count> <dimension>`
    /// header (word2vec) is skipped. Repeated words keep their first vector.
    pub fn from_reader(reader: impl BufRead) -> Result<Self, EmbeddingError> {
        let mut vectors = Self {
            dimension: 0,
            index: HashMap::new(),
            values: Vec::new(),
        };

        for (idx, line) in reader.lines().enumerate() {
            let line = line.context(ReadSnafu)?;
            let line_number = idx + 1;

            let mut fields = line.split_whitespace();
            let Some(word) = fields.next() else {
                continue;
            };
            let rest: Vec<&str> = fields.collect();

            if idx == 0 && rest.len() == 1 && is_word2vec_header(word, rest[0]) {
                continue;
            }

            let values = rest
                .iter()
                .map(|token| {
                    token.parse::<f32>().ok().context(ParseSnafu {
                        line: line_number,
                        token: *token,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            vectors.push(line_number, word, values)?;
        }

        ensure!(!vectors.is_empty(), NoVectorsSnafu);
        Ok(vectors)
    }

    pub fn from_entries<W: Into<String>>(
        entries: impl IntoIterator<Item = (W, Vec<f32>)>,
    ) -> Result<Self, EmbeddingError> {
        let mut vectors = Self {
            dimension: 0,
            index: HashMap::new(),
            values: Vec::new(),
        };
        for (idx, (word, values)) in entries.into_iter().enumerate() {
            let word: String = word.into();
            vectors.push(idx + 1, &word, values)?;
        }

        ensure!(!vectors.is_empty(), NoVectorsSnafu);
        Ok(vectors)
    }

    fn push(&mut self, line: usize, word: &str, values: Vec<f32>) -> Result<(), EmbeddingError> {
        ensure!(!values.is_empty(), MissingValuesSnafu { line, word });

        if self.dimension == 0 {
            self.dimension = values.len();
        }
        ensure!(
            values.len() == self.dimension,
            DimensionMismatchSnafu {
                line,
                expected: self.dimension,
                found: values.len()
            }
        );

        if !self.index.contains_key(word) {
            self.index.insert(word.to_owned(), self.index.len());
            self.values.extend(values);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Looks up `word` as is, then lowercased.
    pub fn vector(&self, word: &str) -> Option<&[f32]> {
        let row = match self.index.get(word) {
            Some(&row) => row,
            None => *self.index.get(&word.to_lowercase())?,
        };
        Some(&self.values[row * self.dimension..(row + 1) * self.dimension])
    }
}

fn is_word2vec_header(first: &str, second: &str) -> bool {
    first.parse::<usize>().is_ok() && second.parse::<usize>().is_ok()
}

impl EmbeddingModel for WordVectors {
    fn dimension(&self) -> usize {
        self.dimension
    }

    /// Mean of the token vectors. Unknown tokens count as zero vectors.
    fn embed(&self, phrase: &str) -> Vec<f32> {
        let mut sum = vec![0.0f32; self.dimension];
        let mut tokens = 0usize;

        for token in phrase.split_whitespace() {
            tokens += 1;
            if let Some(vector) = self.vector(token) {
                for (acc, &v) in sum.iter_mut().zip(vector) {
                    *acc += v;
                }
            }
        }

        if tokens > 1 {
            let scale = 1.0 / tokens as f32;
            sum.iter_mut().for_each(|v| *v *= scale);
        }
        sum
    }
}

/// Cosine similarity accumulated in f64. Zero vectors have similarity 0 with
/// everything.
pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len());

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot = x.mul_add(y, dot);
        norm_a = x.mul_add(x, norm_a);
        norm_b = y.mul_add(y, norm_b);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Cosine similarity between phrase embeddings, memoized per phrase.
pub struct EmbeddingSimilarity {
    model: Arc<dyn EmbeddingModel>,
    cache: VectorCache,
}

impl EmbeddingSimilarity {
    pub fn new(model: Arc<dyn EmbeddingModel>) -> Self {
        Self::with_cache(model, VectorCache::default())
    }

    pub fn with_cache(model: Arc<dyn EmbeddingModel>, cache: VectorCache) -> Self {
        Self { model, cache }
    }

    pub fn model(&self) -> &Arc<dyn EmbeddingModel> {
        &self.model
    }

    pub fn cache(&self) -> &VectorCache {
        &self.cache
    }

    pub fn embedding(&self, phrase: &str) -> Arc<[f32]> {
        self.cache.get_or_insert_with(phrase, || self.model.embed(phrase))
    }
}

impl SimilarityProvider<str> for EmbeddingSimilarity {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        cosine(&self.embedding(a), &self.embedding(b))
    }

    fn matrix<I: AsRef<str> + Sync>(&self, items: &[I]) -> Result<SimilarityMatrix, MatrixError> {
        // Embed each item once, then compare vectors
        let vectors: Vec<Arc<[f32]>> = items
            .par_iter()
            .map(|item| self.embedding(item.as_ref()))
            .collect();

        let n = vectors.len();
        let values = (0..n * n)
            .into_par_iter()
            .map(|idx| cosine(&vectors[idx / n], &vectors[idx % n]))
            .collect();
        SimilarityMatrix::from_flat(values)
    }
}

impl std::fmt::Debug for EmbeddingSimilarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingSimilarity")
            .field("dimension", &self.model.dimension())
            .field("cached", &self.cache.len())
            .finish()
    }
}
