//! Posterior reservoir (C7): a bounded weighted-sample store with
//! minimum-weight eviction.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// One row of the reservoir: raw (unnormalized) log-weight, the dead
/// point's log-likelihood, and its physical/derived coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosteriorRow {
    pub log_weight: f64,
    pub log_l: f64,
    pub physical: Vec<f64>,
    pub derived: Vec<f64>,
}

/// Whether the reservoir grows toward capacity before evicting, or
/// prefers to overwrite low-weight rows first even while under
/// capacity. This crate defaults to overwrite-first; exposed here so
/// a caller can opt back into grow-first without code changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservoirPolicy {
    OverwriteFirst,
    GrowFirst,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosteriorReservoir {
    rows: Vec<PosteriorRow>,
    capacity: usize,
    minimum_weight: f64,
    policy: ReservoirPolicy,
}

impl PosteriorReservoir {
    pub fn new(capacity: usize, minimum_weight: f64, policy: ReservoirPolicy) -> Self {
        PosteriorReservoir {
            rows: Vec::with_capacity(capacity.min(1024)),
            capacity,
            minimum_weight,
            policy,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[PosteriorRow] {
        &self.rows
    }

    fn min_weight_index(&self) -> Option<usize> {
        self.rows
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.log_weight.partial_cmp(&b.log_weight).unwrap_or(Ordering::Equal))
            .map(|(i, _)| i)
    }

    /// Offer a dead point to the reservoir. `log_z` is the current
    /// running evidence estimate, used to judge whether this point's
    /// raw weight clears the configured `minimum_weight` threshold:
    /// offered iff `logL + logw - logZ > log(minimum_weight)`.
    pub fn offer(&mut self, log_l: f64, log_w: f64, log_z: f64, physical: Vec<f64>, derived: Vec<f64>) {
        let log_weight = log_l + log_w;
        if log_weight - log_z <= self.minimum_weight.ln() {
            return;
        }
        let row = PosteriorRow {
            log_weight,
            log_l,
            physical,
            derived,
        };

        if self.rows.len() < self.capacity {
            if self.policy == ReservoirPolicy::OverwriteFirst {
                let threshold = self.minimum_weight.ln() + log_z;
                if let Some(idx) = self.min_weight_index() {
                    if self.rows[idx].log_weight < threshold && row.log_weight >= self.rows[idx].log_weight {
                        self.rows[idx] = row;
                        return;
                    }
                }
            }
            self.rows.push(row);
            return;
        }

        if let Some(idx) = self.min_weight_index() {
            if row.log_weight > self.rows[idx].log_weight {
                self.rows[idx] = row;
            }
        }
    }

    /// `sum(exp(logweight - logZ_final))` over the reservoir; should
    /// tend to 1 as capacity grows and the precision criterion tightens.
    pub fn normalized_weight_sum(&self, log_z_final: f64) -> f64 {
        self.rows
            .iter()
            .map(|r| (r.log_weight - log_z_final).exp())
            .sum()
    }
}
