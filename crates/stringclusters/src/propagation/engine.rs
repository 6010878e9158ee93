use super::Cancellation;
use super::convergence::ExemplarWindow;
use super::messages::Messages;
use crate::matrix::SimilarityMatrix;
use crate::noise;
use crate::options::AffinityPropagationOptions;
use tracing::{debug, trace, warn};

#[derive(Debug)]
pub struct Outcome {
    pub assignments: Vec<usize>,
    pub converged: bool,
    pub iterations: usize,
    /// Final messages; `None` when the input was short-circuited as uniform.
    pub messages: Option<Messages>,
    /// Number of exemplars after each iteration.
    pub exemplar_counts: Vec<usize>,
}

#[derive(Debug)]
pub struct Cancelled {
    pub iterations: usize,
}

/// Runs the message-passing loop. Options must already be validated.
pub fn run(
    similarities: &SimilarityMatrix,
    options: &AffinityPropagationOptions,
    cancellation: Option<&Cancellation>,
) -> Result<Outcome, Cancelled> {
    let n = similarities.len();
    debug_assert!(options.validate().is_ok());

    if n == 1 {
        return Ok(Outcome {
            assignments: vec![0],
            converged: true,
            iterations: 0,
            messages: Some(Messages::new(1)),
            exemplar_counts: Vec::new(),
        });
    }

    if let Some((similarity, preference)) = similarities.uniform_values() {
        // Every item is interchangeable, the messages would only encode tie-breaks
        let assignments: Vec<usize> = if preference > similarity {
            (0..n).collect()
        } else {
            vec![0; n]
        };
        debug!(
            n,
            similarity, preference, "uniform similarities, skipping message passing"
        );
        return Ok(Outcome {
            assignments,
            converged: true,
            iterations: 0,
            messages: None,
            exemplar_counts: Vec::new(),
        });
    }

    let noisy;
    let similarities = if options.degeneracy_noise {
        noisy = noise::remove_degeneracies(similarities);
        &noisy
    } else {
        similarities
    };

    let mut messages = Messages::new(n);
    let mut window = ExemplarWindow::new(options.convergence_window);
    let mut exemplar_counts = Vec::with_capacity(options.max_iterations);
    let mut converged = false;
    let mut iterations = 0;

    for iteration in 0..options.max_iterations {
        if cancellation.is_some_and(Cancellation::is_cancelled) {
            debug!(iterations, "clustering cancelled");
            return Err(Cancelled { iterations });
        }

        messages.update_responsibilities(similarities, options.damping);
        messages.update_availabilities(options.damping);
        iterations = iteration + 1;

        let exemplars = messages.exemplars();
        trace!(iteration = iterations, exemplars = exemplars.len());
        exemplar_counts.push(exemplars.len());

        if window.observe(exemplars) {
            converged = true;
            break;
        }
    }

    let assignments = messages.assignments();
    if converged {
        debug!(n, iterations, "affinity propagation converged");
    } else {
        warn!(
            n,
            iterations,
            stable_for = window.stable_for(),
            "affinity propagation did not converge, returning the last assignment"
        );
    }

    Ok(Outcome {
        assignments,
        converged,
        iterations,
        messages: Some(messages),
        exemplar_counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run_default(s: &SimilarityMatrix) -> Outcome {
        run(s, &AffinityPropagationOptions::default(), None).unwrap()
    }

    #[test]
    fn single_item() {
        let s = SimilarityMatrix::from_rows(&[[-3.0]]).unwrap();
        let outcome = run_default(&s);
        assert_eq!(outcome.assignments, vec![0]);
        assert!(outcome.converged);
        assert_eq!(outcome.iterations, 0);
    }

    #[test]
    fn uniform_high_preference_gives_singletons() {
        let s = SimilarityMatrix::from_fn(4, |i, j| if i == j { 0.0 } else { -1.0 }).unwrap();
        let outcome = run_default(&s);
        assert_eq!(outcome.assignments, vec![0, 1, 2, 3]);
        assert!(outcome.converged);
        assert!(outcome.messages.is_none());
    }

    #[test]
    fn uniform_low_preference_gives_one_cluster() {
        for preference in [-1.0, -5.0] {
            let s =
                SimilarityMatrix::from_fn(4, |i, j| if i == j { preference } else { -1.0 }).unwrap();
            assert_eq!(run_default(&s).assignments, vec![0, 0, 0, 0]);
        }
    }

    #[test]
    fn exemplar_counts_follow_iterations() {
        let s = SimilarityMatrix::from_fn(4, |i, j| {
            if i == j {
                -5.0
            } else if i / 2 == j / 2 {
                -1.0
            } else {
                -100.0
            }
        })
        .unwrap();
        let outcome = run_default(&s);
        assert_eq!(outcome.exemplar_counts.len(), outcome.iterations);
        assert_eq!(outcome.exemplar_counts.last(), Some(&2));
    }

    #[test]
    fn cancelled_before_first_iteration() {
        let s = SimilarityMatrix::from_fn(3, |i, j| -((i as f64) - (j as f64)).powi(2)).unwrap();
        let cancellation = Cancellation::new();
        cancellation.cancel();

        let err = run(&s, &AffinityPropagationOptions::default(), Some(&cancellation)).unwrap_err();
        assert_eq!(err.iterations, 0);
    }
}
