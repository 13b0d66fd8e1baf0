//! Runtime knobs for a [`crate::Solver`] (§2.1 ambient stack).
//!
//! There's exactly two numbers worth tuning: the epsilon used by every
//! approximate-equality check in §3, and a defensive iteration ceiling for
//! the simplex loops so a malformed or adversarial constraint set fails
//! loudly instead of spinning forever.

/// Default epsilon for the `f64` build: `1e-6`, per §3. The reference's
/// `f32` build uses `1e-4`; this port only targets `f64` (see `SPEC_FULL.md`
/// §3), so that variant isn't exposed.
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// Default ceiling on simplex pivots per `optimize`/`dual_optimize` call
/// before giving up rather than looping forever on a malformed tableau.
pub const DEFAULT_MAX_ITERATIONS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverConfig {
    pub(crate) epsilon: f64,
    pub(crate) max_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            epsilon: DEFAULT_EPSILON,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl SolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub(crate) fn near_zero(&self, value: f64) -> bool {
        value.abs() < self.epsilon
    }

    pub(crate) fn approx(&self, a: f64, b: f64) -> bool {
        self.near_zero(a - b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_epsilon() {
        assert_eq!(SolverConfig::default().epsilon(), 1e-6);
    }

    #[test]
    fn builder_overrides_epsilon() {
        let config = SolverConfig::new().with_epsilon(1e-3);
        assert_eq!(config.epsilon(), 1e-3);
    }

    #[test]
    fn builder_overrides_max_iterations() {
        let config = SolverConfig::new().with_max_iterations(64);
        assert_eq!(config.max_iterations(), 64);
    }

    #[test]
    fn near_zero_and_approx_are_consistent() {
        let config = SolverConfig::default();
        assert!(config.near_zero(1e-9));
        assert!(!config.near_zero(1e-3));
        assert!(config.approx(1.0000001, 1.0));
    }
}
