//! End-to-end scenarios from the testable-properties list: uniform
//! prior with a constant likelihood, and an isotropic Gaussian
//! likelihood, run through the public `run` entry point.

use std::sync::Arc;

use nested_sampling_core::config::Config;
use nested_sampling_core::model::{Likelihood, ModelEvaluator};
use nested_sampling_core::prior::UniformBlock;
use nested_sampling_core::sampler::RejectionSampler;
use nested_sampling_core::scheduler::Scheduler;

#[derive(Clone)]
struct ConstantLikelihood;

impl Likelihood for ConstantLikelihood {
    type Context = ();

    fn log_likelihood(&self, _physical: &[f64], _derived_out: &mut [f64], _ctx: &()) -> f64 {
        0.0
    }
}

#[derive(Clone)]
struct IsotropicGaussian;

impl Likelihood for IsotropicGaussian {
    type Context = ();

    fn log_likelihood(&self, physical: &[f64], _derived_out: &mut [f64], _ctx: &()) -> f64 {
        -0.5 * physical.iter().map(|x| x * x).sum::<f64>()
    }
}

fn toy_config(dir: &std::path::Path, n_dims: usize, nlive: usize, nprocs: usize, seed: u64) -> Config {
    Config {
        n_dims,
        n_derived: 0,
        nlive,
        chain_length: 2,
        nprocs,
        precision_criterion: 1e-3,
        max_ndead: 20_000,
        write_resume: true,
        write_paramnames: false,
        write_stats: false,
        posteriors: false,
        base_dir: dir.to_path_buf(),
        file_root: "run".to_string(),
        seed,
        nmax_posterior: 2 * nlive,
        ..Config::default()
    }
}

// Scenario 1: uniform prior, L === 0 on [0, 1]^2, nlive = 100 -> logZ -> 0.
#[test]
fn scenario_constant_likelihood_logz_near_zero() {
    let dir = tempfile::tempdir().unwrap();
    let config = toy_config(dir.path(), 2, 100, 2, 1);

    let summary = nested_sampling_core::run(config, UniformBlock::new(vec![0.0, 0.0], vec![1.0, 1.0]), ConstantLikelihood, (), None, 1_000_000).unwrap();

    assert!(summary.log_z.abs() < 0.2, "logZ = {}", summary.log_z);
}

// Scenario 2: standard Gaussian on [-10, 10]^5, nlive = 500 -> logZ ~ 5*log(sqrt(2pi)/20).
#[test]
fn scenario_standard_gaussian_matches_analytic_evidence() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = toy_config(dir.path(), 5, 500, 4, 7);
    config.max_ndead = 60_000;

    let half_width = 10.0;
    let prior = UniformBlock::new(vec![-half_width; 5], vec![half_width; 5]);
    let summary = nested_sampling_core::run(config, prior, IsotropicGaussian, (), None, 2_000_000).unwrap();

    let expected = 5.0 * ((2.0 * std::f64::consts::PI).sqrt() / 20.0).ln();
    let sigma = summary.log_z_error.max(0.5);
    assert!(
        (summary.log_z - expected).abs() < 3.0 * sigma + 1.0,
        "logZ = {}, expected ~= {}",
        summary.log_z,
        expected
    );
}

// Checkpoint round-trip: interrupt a run after a bounded number of dead
// points, resume it, and check the resumed run finishes cleanly instead
// of re-deriving an initial population.
#[test]
fn resume_from_checkpoint_continues_instead_of_restarting() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = toy_config(dir.path(), 2, 50, 2, 3);
    config.max_ndead = 30;
    config.update_files = 5;

    let evaluator = ModelEvaluator::new(UniformBlock::new(vec![0.0, 0.0], vec![1.0, 1.0]), ConstantLikelihood, ());
    let sampler = Arc::new(RejectionSampler::new(evaluator, 2, 0, 500_000));

    let mut scheduler: Scheduler<RejectionSampler<UniformBlock, ConstantLikelihood>> =
        Scheduler::new(config.clone(), sampler.clone()).unwrap();
    let init_evaluator = ModelEvaluator::new(UniformBlock::new(vec![0.0, 0.0], vec![1.0, 1.0]), ConstantLikelihood, ());
    scheduler.populate_initial(&init_evaluator).unwrap();
    let first_summary = scheduler.run().unwrap();
    assert!(first_summary.ndead >= 30);
    assert!(config.resume_path().exists());

    let mut resume_config = config.clone();
    resume_config.read_resume = true;
    resume_config.max_ndead = first_summary.ndead + 20;
    let mut resumed: Scheduler<RejectionSampler<UniformBlock, ConstantLikelihood>> =
        Scheduler::resume(resume_config, sampler).unwrap();
    let second_summary = resumed.run().unwrap();

    assert!(second_summary.ndead >= first_summary.ndead);
    assert!(second_summary.log_z.is_finite());
}
