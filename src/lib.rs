//! A parallel nested sampling engine: given a prior transform and a
//! log-likelihood over a bounded parameter space, estimates the
//! Bayesian evidence `log Z` and produces weighted posterior samples.
//!
//! The public entry point is [`run`]; the modules below implement the
//! components it coordinates (point records, the prior/model/sampler
//! interfaces, the live-point stack, the evidence accumulator, the
//! posterior reservoir, the master/worker scheduler, checkpointing,
//! and feedback).

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod evidence;
pub mod feedback;
pub mod io;
pub mod logging;
pub mod model;
pub mod point;
pub mod posterior;
pub mod prior;
pub mod sampler;
pub mod scheduler;
pub mod stack;

use std::sync::Arc;

use rand::rngs::StdRng;

pub use config::Config;
pub use error::{NestedSamplingError, Result};
pub use scheduler::{RunSummary, Scheduler};

use model::{Likelihood, ModelEvaluator};
use prior::Prior;
use sampler::RejectionSampler;

/// The public entry point exposed to bindings: given a prior
/// transform, a log-likelihood, and a run configuration, drives the
/// full parallel nested sampling run to completion and writes the
/// configured output files under `config.base_dir`. Returns the final
/// evidence summary; detailed results live in the files and in the
/// scheduler's posterior reservoir for callers who want them in-process.
///
/// `max_sampler_trials` bounds the brute-force reference sampler's
/// rejection budget per draw; a real binding would substitute its own
/// [`sampler::WithinContourSampler`] instead of going through this
/// convenience wrapper.
pub fn run<P, L>(
    config: Config,
    prior: P,
    likelihood: L,
    context: L::Context,
    param_names: Option<Vec<String>>,
    max_sampler_trials: u64,
) -> Result<RunSummary>
where
    P: Prior + Clone + 'static,
    L: Likelihood + Clone + 'static,
{
    config.validate()?;
    logging::init_tracing(config.feedback);

    if !config.base_dir.exists() {
        std::fs::create_dir_all(&config.base_dir).map_err(|e| NestedSamplingError::Io {
            path: config.base_dir.clone(),
            source: e,
        })?;
    }

    let n_dims = config.n_dims;
    let n_derived = config.n_derived;

    let worker_evaluator = ModelEvaluator::new(prior.clone(), likelihood.clone(), context.clone());
    let sampler = Arc::new(RejectionSampler::new(worker_evaluator, n_dims, n_derived, max_sampler_trials));

    let mut scheduler: Scheduler<RejectionSampler<P, L>> = if config.read_resume && config.resume_path().exists() {
        Scheduler::resume(config.clone(), sampler)?
    } else {
        let mut scheduler = Scheduler::new(config.clone(), sampler)?;
        let init_evaluator = ModelEvaluator::new(prior, likelihood, context);
        scheduler.populate_initial(&init_evaluator)?;
        scheduler
    };

    let summary = scheduler.run()?;

    if config.write_paramnames {
        io::write_paramnames(&config.paramnames_path(), n_dims, n_derived, param_names.as_deref())?;
    }
    if config.posteriors {
        io::write_posterior(&config.posterior_path(), scheduler.posterior(), summary.log_z)?;
    }
    if config.write_stats {
        io::write_stats(&config.stats_path(), scheduler.evidence(), summary.total_likelihood_calls)?;
    }

    Ok(summary)
}

/// Convenience alias matching the RNG type the bundled reference
/// sampler and scheduler use throughout.
pub type DefaultRng = StdRng;
