use crate::matrix::{MAX_ABS_SIMILARITY, SimilarityMatrix};
use rand::{RngExt, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

// Fixed so that noisy runs stay reproducible
const RANDOM_SEED: u64 = 0x5eed_ab1e;

pub fn new_rng() -> impl RngExt {
    Xoshiro256PlusPlus::seed_from_u64(RANDOM_SEED)
}

/// Perturbs every entry by a uniform draw in `[-1, 1)` times `ε·|s| + 100·tiny`.
/// This is the same scale scikit-learn uses to break ties between otherwise
/// identical items, though scikit-learn draws from a standard normal.
pub fn remove_degeneracies(similarities: &SimilarityMatrix) -> SimilarityMatrix {
    let mut rng = new_rng();
    let tiny = f64::MIN_POSITIVE * 100.0;

    similarities.map(|_, _, s| {
        let u = rng.random::<f64>() * 2.0 - 1.0;
        (s + (f64::EPSILON * s + tiny) * u).clamp(-MAX_ABS_SIMILARITY, MAX_ABS_SIMILARITY)
    })
}
