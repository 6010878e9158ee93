use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub mod convergence;
pub mod engine;
pub mod messages;

// References:
// - Clustering by Passing Messages Between Data Points (B. J. Frey, D. Dueck)
//   https://www.science.org/doi/10.1126/science.1136800
// - https://scikit-learn.org/stable/modules/generated/sklearn.cluster.AffinityPropagation.html
//
// Observations:
// - Perfectly symmetric inputs leave A + R tied along whole rows at the fixed point,
//   so the lowest-index tie-break decides the outcome. Uniform matrices are
//   short-circuited for that reason; near-uniform ones may need degeneracy noise.

/// Cooperative cancellation for long clustering runs.
///
/// Clones share the same flag. The engine checks it once per iteration.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
