use snafu::prelude::*;

// scikit-learn AffinityPropagation defaults
pub const DEFAULT_DAMPING: f64 = 0.5;
pub const DEFAULT_MAX_ITERATIONS: usize = 200;
pub const DEFAULT_CONVERGENCE_WINDOW: usize = 15;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum ConfigError {
    #[snafu(display("damping must be strictly between 0 and 1, got {damping}"))]
    Damping { damping: f64 },

    #[snafu(display("max_iterations must be positive"))]
    ZeroMaxIterations,

    #[snafu(display("convergence_window must be positive"))]
    ZeroConvergenceWindow,
}

/// Tuning parameters for the message-passing loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffinityPropagationOptions {
    /// Weight of the previous message value, in (0, 1).
    pub damping: f64,
    /// Upper bound on the number of iterations.
    pub max_iterations: usize,
    /// Number of consecutive iterations the exemplar set must stay unchanged.
    pub convergence_window: usize,
    /// Perturb the similarities by a few ulps with a fixed-seed generator
    /// before iterating, which breaks exact ties between symmetric items.
    pub degeneracy_noise: bool,
}

impl Default for AffinityPropagationOptions {
    fn default() -> Self {
        Self {
            damping: DEFAULT_DAMPING,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            convergence_window: DEFAULT_CONVERGENCE_WINDOW,
            degeneracy_noise: false,
        }
    }
}

impl AffinityPropagationOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(
            self.damping > 0.0 && self.damping < 1.0,
            DampingSnafu {
                damping: self.damping
            }
        );
        ensure!(self.max_iterations > 0, ZeroMaxIterationsSnafu);
        ensure!(self.convergence_window > 0, ZeroConvergenceWindowSnafu);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let options = AffinityPropagationOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.damping, 0.5);
        assert_eq!(options.max_iterations, 200);
        assert_eq!(options.convergence_window, 15);
        assert!(!options.degeneracy_noise);
    }

    #[test]
    fn damping_bounds_are_exclusive() {
        for damping in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            let options = AffinityPropagationOptions {
                damping,
                ..Default::default()
            };
            let err = options.validate().unwrap_err();
            assert!(matches!(err, ConfigError::Damping { .. }), "{damping}");
        }

        let options = AffinityPropagationOptions {
            damping: 0.01,
            ..Default::default()
        };
        assert!(options.validate().is_ok());
    }

    #[test]
    fn limits_must_be_positive() {
        let options = AffinityPropagationOptions {
            max_iterations: 0,
            ..Default::default()
        };
        assert!(matches!(
            options.validate().unwrap_err(),
            ConfigError::ZeroMaxIterations
        ));

        let options = AffinityPropagationOptions {
            convergence_window: 0,
            ..Default::default()
        };
        assert!(
            options
                .validate()
                .unwrap_err()
                .to_string()
                .contains("convergence_window")
        );
    }
}
