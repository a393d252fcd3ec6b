//! Draw states and emissions from a model.

use super::GaussianHmm;
use lva_math::{categorical_index, standard_normal_from_uniforms};
use rand::Rng;

impl GaussianHmm {
    /// Draw an initial state from the current start distribution.
    pub fn sample_initial_state<R: Rng>(&self, rng: &mut R) -> usize {
        categorical_index(self.start_prob(), rng.random::<f64>()).unwrap_or(0)
    }

    /// Draw the successor of `state`.
    pub fn sample_next_state<R: Rng>(&self, state: usize, rng: &mut R) -> usize {
        categorical_index(&self.trans_prob()[state], rng.random::<f64>()).unwrap_or(state)
    }

    /// Draw one interval from the emission of `state`.
    pub fn sample_emission<R: Rng>(&self, state: usize, rng: &mut R) -> f64 {
        // 1 - u keeps the Box-Muller radius argument in (0, 1]
        let u1 = 1.0 - rng.random::<f64>();
        let u2 = rng.random::<f64>();
        let z = standard_normal_from_uniforms(u1, u2);
        self.means()[state] + self.variances()[state].sqrt() * z
    }
}
