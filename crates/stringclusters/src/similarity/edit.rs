use super::SimilarityProvider;

/// Levenshtein distance over Unicode scalar values.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Two rows of the DP table are enough
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Negated edit distance, so that identical strings score 0 and everything
/// else is negative.
#[derive(Debug, Clone, Copy, Default)]
pub struct EditDistance;

impl SimilarityProvider<str> for EditDistance {
    #[inline]
    fn similarity(&self, a: &str, b: &str) -> f64 {
        -(levenshtein(a, b) as f64)
    }
}
