//! Demo CLI front door: wires a toy uniform-prior / isotropic-Gaussian
//! likelihood pair through the public entry point, for manual
//! smoke-testing of the engine.

use clap::Parser;

use nested_sampling_core::config::Config;
use nested_sampling_core::model::Likelihood;
use nested_sampling_core::prior::UniformBlock;

#[derive(Clone)]
struct IsotropicGaussian;

impl Likelihood for IsotropicGaussian {
    type Context = ();

    fn log_likelihood(&self, physical: &[f64], _derived_out: &mut [f64], _ctx: &()) -> f64 {
        -0.5 * physical.iter().map(|x| x * x).sum::<f64>()
    }
}

fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    let half_width = 10.0;
    let prior = UniformBlock::new(vec![-half_width; config.n_dims], vec![half_width; config.n_dims]);
    let likelihood = IsotropicGaussian;

    let summary = nested_sampling_core::run(config, prior, likelihood, (), None, 1_000_000)?;

    println!(
        "ndead = {}, logZ = {:.4} +/- {:.4}, total likelihood calls = {}",
        summary.ndead, summary.log_z, summary.log_z_error, summary.total_likelihood_calls
    );
    Ok(())
}
