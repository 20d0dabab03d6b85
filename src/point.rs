//! Point record (C1): the fixed-layout numeric record carried between
//! every other component, and the tagged status of its daughter slot.

use serde::{Deserialize, Serialize};

/// Status of a stack slot's daughter, replacing the `{-2, -1, 0, >=1}`
/// sentinel/index mix the original scheme used (see the REDESIGN FLAG
/// in the design notes): a plain tagged variant with the index broken
/// out as its own field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DaughterStatus {
    /// Slot is empty.
    Blank,
    /// Slot reserved; a worker is producing the point.
    Gestating,
    /// Live point present, no daughter launched yet.
    Waiting,
    /// Stack index of the daughter slot launched from this mother.
    HasDaughter(usize),
}

impl DaughterStatus {
    pub fn is_live(&self) -> bool {
        matches!(self, DaughterStatus::Waiting | DaughterStatus::HasDaughter(_))
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, DaughterStatus::Blank)
    }

    pub fn is_gestating(&self) -> bool {
        matches!(self, DaughterStatus::Gestating)
    }

    pub fn daughter_index(&self) -> Option<usize> {
        match self {
            DaughterStatus::HasDaughter(idx) => Some(*idx),
            _ => None,
        }
    }
}

/// One sample: its coordinates in both spaces, derived quantities, the
/// likelihoods that bracket it, and the bookkeeping the scheduler needs
/// to order births and deaths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Coordinates in `[0, 1]^D`.
    pub hypercube: Vec<f64>,
    /// Coordinates after the prior transform.
    pub physical: Vec<f64>,
    /// Derived quantities produced by the likelihood.
    pub derived: Vec<f64>,
    /// Log-likelihood at this point.
    pub l0: f64,
    /// The contour bound `log L_bound` this point was generated against.
    pub l1: f64,
    /// Likelihood evaluations consumed producing this point.
    pub nlike: u64,
    /// Adaptive step-size hint carried between generations.
    pub last_chord: f64,
    /// Slot status / daughter linkage.
    pub daughter: DaughterStatus,
}

impl Point {
    /// A blank point sized for `n_dims` hypercube/physical coordinates
    /// and `n_derived` derived quantities.
    pub fn blank(n_dims: usize, n_derived: usize) -> Self {
        Point {
            hypercube: vec![0.0; n_dims],
            physical: vec![0.0; n_dims],
            derived: vec![0.0; n_derived],
            l0: f64::NEG_INFINITY,
            l1: f64::NEG_INFINITY,
            nlike: 0,
            last_chord: (n_dims as f64).sqrt(),
            daughter: DaughterStatus::Blank,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.daughter.is_blank()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_point_has_sqrt_d_chord_and_neg_inf_likelihoods() {
        let p = Point::blank(4, 2);
        assert_eq!(p.hypercube.len(), 4);
        assert_eq!(p.derived.len(), 2);
        assert_eq!(p.l0, f64::NEG_INFINITY);
        assert_eq!(p.l1, f64::NEG_INFINITY);
        assert!((p.last_chord - 2.0).abs() < 1e-12);
        assert!(p.is_blank());
    }

    #[test]
    fn daughter_status_predicates() {
        assert!(DaughterStatus::Waiting.is_live());
        assert!(DaughterStatus::HasDaughter(3).is_live());
        assert!(!DaughterStatus::Gestating.is_live());
        assert!(DaughterStatus::Gestating.is_gestating());
        assert!(DaughterStatus::Blank.is_blank());
        assert_eq!(DaughterStatus::HasDaughter(7).daughter_index(), Some(7));
        assert_eq!(DaughterStatus::Waiting.daughter_index(), None);
    }
}
