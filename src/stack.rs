//! Live-point stack (C5): the extended-capacity array holding active
//! live points plus in-flight gestating slots and blank slots.

use ordered_float::OrderedFloat;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{Likelihood, ModelEvaluator};
use crate::point::{DaughterStatus, Point};
use crate::prior::Prior;

/// Backing array for the population. Capacity is
/// `nlive * chain_length * 2`, floored at `2 * nlive`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivePointStack {
    slots: Vec<Point>,
    nlive: usize,
}

impl LivePointStack {
    pub fn capacity_for(nlive: usize, chain_length: usize) -> usize {
        (nlive * chain_length * 2).max(2 * nlive)
    }

    pub fn new(nlive: usize, chain_length: usize, n_dims: usize, n_derived: usize) -> Self {
        let capacity = Self::capacity_for(nlive, chain_length);
        let slots = (0..capacity).map(|_| Point::blank(n_dims, n_derived)).collect();
        LivePointStack { slots, nlive }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn nlive_target(&self) -> usize {
        self.nlive
    }

    pub fn read(&self, index: usize) -> &Point {
        &self.slots[index]
    }

    pub fn write(&mut self, index: usize, point: Point) {
        self.slots[index] = point;
    }

    pub fn slot_mut(&mut self, index: usize) -> &mut Point {
        &mut self.slots[index]
    }

    /// Populate `nlive` slots by uniform draws from the hypercube
    /// through the model evaluator. Sets `daughter = Waiting`,
    /// `l1 = -inf`, `last_chord = sqrt(D)`. Remaining slots stay blank.
    pub fn generate_initial<P, L, R>(
        &mut self,
        evaluator: &ModelEvaluator<P, L>,
        n_dims: usize,
        rng: &mut R,
    ) -> Result<()>
    where
        P: Prior,
        L: Likelihood,
        R: Rng,
    {
        for i in 0..self.nlive {
            let mut p = Point::blank(n_dims, self.slots[i].derived.len());
            for x in p.hypercube.iter_mut() {
                *x = rng.gen_range(0.0..1.0);
            }
            evaluator.calculate_point(&mut p)?;
            p.daughter = DaughterStatus::Waiting;
            p.l1 = f64::NEG_INFINITY;
            p.last_chord = (n_dims as f64).sqrt();
            self.slots[i] = p;
        }
        Ok(())
    }

    /// Index of the minimum-`l0` slot among live slots (`daughter ==
    /// Waiting`, i.e. not yet assigned a daughter). Returns `None` if
    /// there is none.
    pub fn lowest_waiting(&self) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, p)| matches!(p.daughter, DaughterStatus::Waiting))
            .min_by_key(|(_, p)| OrderedFloat(p.l0))
            .map(|(i, _)| i)
    }

    /// Index of the minimum-`l0` live slot overall (`Waiting` or
    /// `HasDaughter`), used to compute `<logL>_live`.
    pub fn lowest_live(&self) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, p)| p.daughter.is_live())
            .min_by_key(|(_, p)| OrderedFloat(p.l0))
            .map(|(i, _)| i)
    }

    /// Index of any blank slot, or `None` if the stack is full.
    pub fn claim_blank(&self) -> Option<usize> {
        self.slots.iter().position(|p| p.is_blank())
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|p| p.daughter.is_live()).count()
    }

    pub fn gestating_count(&self) -> usize {
        self.slots.iter().filter(|p| p.daughter.is_gestating()).count()
    }

    /// Mean log-likelihood over the current live set (`<logL>_live`).
    pub fn mean_live_log_likelihood(&self) -> f64 {
        let live: Vec<f64> = self
            .slots
            .iter()
            .filter(|p| p.daughter.is_live())
            .map(|p| p.l0)
            .collect();
        if live.is_empty() {
            return f64::NEG_INFINITY;
        }
        live.iter().sum::<f64>() / live.len() as f64
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        self.slots.iter()
    }

    /// Cancel every `GESTATING` slot: reblank it and reset its mother's
    /// `daughter` back to `Waiting`. Used when resuming from a
    /// checkpoint since no worker is still producing the
    /// in-flight baby.
    pub fn cancel_gestating(&mut self) {
        let n_dims = self.slots.first().map(|p| p.hypercube.len()).unwrap_or(0);
        let n_derived = self.slots.first().map(|p| p.derived.len()).unwrap_or(0);
        let gestating: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, p)| p.daughter.is_gestating())
            .map(|(i, _)| i)
            .collect();
        for idx in gestating {
            self.slots[idx] = Point::blank(n_dims, n_derived);
        }
        // Any mother whose daughter slot just got reblanked reverts to
        // Waiting.
        for idx in 0..self.slots.len() {
            if let DaughterStatus::HasDaughter(d) = self.slots[idx].daughter {
                if self.slots[d].is_blank() {
                    self.slots[idx].daughter = DaughterStatus::Waiting;
                }
            }
        }
    }

    /// Uniform random choice over the stack, rejecting until a
    /// non-blank point is found with `l0 > l_bound` and `l1 <=
    /// l_bound`. Gives up after `10 * capacity` rejections.
    pub fn draw_seed_body<R: Rng>(&self, l_bound: f64, rng: &mut R) -> Option<usize> {
        if self.slots.is_empty() {
            return None;
        }
        let max_rejections = 10 * self.slots.len();
        for _ in 0..max_rejections {
            let idx = rng.gen_range(0..self.slots.len());
            let p = &self.slots[idx];
            if p.is_blank() {
                continue;
            }
            if p.l0 > l_bound && p.l1 <= l_bound {
                return Some(idx);
            }
        }
        None
    }
}
