//! Prior transform (C2): maps unit-hypercube coordinates to physical
//! coordinates. Must be bijective on its support; composed of
//! independent blocks over disjoint index ranges.

use crate::error::{NestedSamplingError, Result};

/// A single prior block, consuming one contiguous span of hypercube
/// indices and producing the same-width span of physical indices.
pub trait Prior: Send + Sync {
    /// Number of hypercube (== physical) dimensions this block owns.
    fn dims(&self) -> usize;

    /// Map `hypercube` (length `self.dims()`) into `physical` (same
    /// length). Fails with `PriorDomain` if `hypercube` contains a
    /// value outside `[0, 1]`, which should only be reachable under
    /// data corruption upstream.
    fn transform(&self, hypercube: &[f64], physical: &mut [f64]) -> Result<()>;
}

fn check_unit_interval(hypercube: &[f64]) -> Result<()> {
    for (i, x) in hypercube.iter().enumerate() {
        if !(0.0..=1.0).contains(x) {
            return Err(NestedSamplingError::PriorDomain(format!(
                "hypercube[{i}] = {x} outside [0, 1]"
            )));
        }
    }
    Ok(())
}

/// A uniform prior over `[low, high]` per dimension. The one concrete
/// prior family carried in this crate purely so the end-to-end tests
/// and the demo binary have something to run; concrete prior families
/// in general are out of scope.
#[derive(Clone)]
pub struct UniformBlock {
    pub low: Vec<f64>,
    pub high: Vec<f64>,
}

impl UniformBlock {
    pub fn new(low: Vec<f64>, high: Vec<f64>) -> Self {
        assert_eq!(low.len(), high.len());
        UniformBlock { low, high }
    }
}

impl Prior for UniformBlock {
    fn dims(&self) -> usize {
        self.low.len()
    }

    fn transform(&self, hypercube: &[f64], physical: &mut [f64]) -> Result<()> {
        check_unit_interval(hypercube)?;
        for i in 0..self.dims() {
            physical[i] = self.low[i] + hypercube[i] * (self.high[i] - self.low[i]);
        }
        Ok(())
    }
}

/// Composes independent prior blocks, each owning a disjoint span of
/// the hypercube/physical index space, into a single total transform
/// over `[0, 1]^D`.
pub struct CompositePrior {
    blocks: Vec<Box<dyn Prior>>,
}

impl CompositePrior {
    pub fn new(blocks: Vec<Box<dyn Prior>>) -> Self {
        CompositePrior { blocks }
    }
}

impl Prior for CompositePrior {
    fn dims(&self) -> usize {
        self.blocks.iter().map(|b| b.dims()).sum()
    }

    fn transform(&self, hypercube: &[f64], physical: &mut [f64]) -> Result<()> {
        let mut offset = 0;
        for block in &self.blocks {
            let d = block.dims();
            block.transform(&hypercube[offset..offset + d], &mut physical[offset..offset + d])?;
            offset += d;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_block_scales_unit_interval() {
        let block = UniformBlock::new(vec![-10.0], vec![10.0]);
        let mut physical = vec![0.0];
        block.transform(&[0.5], &mut physical).unwrap();
        assert!((physical[0] - 0.0).abs() < 1e-12);
        block.transform(&[0.0], &mut physical).unwrap();
        assert!((physical[0] - -10.0).abs() < 1e-12);
        block.transform(&[1.0], &mut physical).unwrap();
        assert!((physical[0] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_hypercube_fails() {
        let block = UniformBlock::new(vec![0.0], vec![1.0]);
        let mut physical = vec![0.0];
        let err = block.transform(&[1.5], &mut physical).unwrap_err();
        assert!(matches!(err, NestedSamplingError::PriorDomain(_)));
    }

    #[test]
    fn composite_prior_dispatches_disjoint_blocks() {
        let composite = CompositePrior::new(vec![
            Box::new(UniformBlock::new(vec![0.0], vec![1.0])),
            Box::new(UniformBlock::new(vec![-5.0, -5.0], vec![5.0, 5.0])),
        ]);
        assert_eq!(composite.dims(), 3);
        let mut physical = vec![0.0; 3];
        composite
            .transform(&[0.25, 0.0, 1.0], &mut physical)
            .unwrap();
        assert!((physical[0] - 0.25).abs() < 1e-12);
        assert!((physical[1] - -5.0).abs() < 1e-12);
        assert!((physical[2] - 5.0).abs() < 1e-12);
    }
}
