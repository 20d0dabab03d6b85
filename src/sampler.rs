//! Within-contour sampler (C4): given a seed point and an implicit
//! likelihood contour, produces a new independent sample with
//! `L > L_bound`. Contract-only; concrete variants (slice sampling,
//! spherical-center, brute force) are external collaborators in
//! general. `RejectionSampler` below is the one concrete implementation
//! kept in this crate, so the engine is runnable without a
//! language-binding layer.

use rand::Rng;

use crate::error::Result;
use crate::model::{Likelihood, ModelEvaluator};
use crate::point::{DaughterStatus, Point};
use crate::prior::Prior;

/// `sample(seed) -> baby`. Implementations must return a point with
/// `l0 > seed.l1`, drawn (to the implementation's approximation)
/// independently from the prior restricted to `{theta : L(theta) > L_bound}`.
/// They must carry `last_chord` forward, record `nlike` consumed, and
/// preserve the daughter index the seed carries.
pub trait WithinContourSampler<R: Rng> {
    fn sample(&self, seed: &Point, rng: &mut R) -> Result<Point>;
}

/// Brute-force rejection sampling: draw fresh hypercube points
/// uniformly and keep the first whose likelihood clears the contour.
/// Simple, correct, and arbitrarily wasteful as the contour shrinks.
pub struct RejectionSampler<P: Prior, L: Likelihood> {
    evaluator: ModelEvaluator<P, L>,
    n_dims: usize,
    n_derived: usize,
    max_trials: u64,
}

impl<P: Prior, L: Likelihood> RejectionSampler<P, L> {
    pub fn new(evaluator: ModelEvaluator<P, L>, n_dims: usize, n_derived: usize, max_trials: u64) -> Self {
        RejectionSampler {
            evaluator,
            n_dims,
            n_derived,
            max_trials,
        }
    }
}

impl<P: Prior, L: Likelihood, R: Rng> WithinContourSampler<R> for RejectionSampler<P, L> {
    fn sample(&self, seed: &Point, rng: &mut R) -> Result<Point> {
        let l_bound = seed.l1;
        let mut trials = 0u64;
        let mut candidate = Point::blank(self.n_dims, self.n_derived);
        candidate.last_chord = seed.last_chord;
        candidate.daughter = seed.daughter;

        loop {
            for x in candidate.hypercube.iter_mut() {
                *x = rng.gen_range(0.0..1.0);
            }
            self.evaluator.calculate_point(&mut candidate)?;
            trials += 1;
            if candidate.l0 > l_bound {
                break;
            }
            if trials >= self.max_trials {
                break;
            }
        }
        candidate.nlike = trials;
        candidate.daughter = seed.daughter;
        Ok(candidate)
    }
}
