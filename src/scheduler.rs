//! Parallel scheduler (C8): the master/worker state machine that
//! dispatches seeds, receives babies, and promotes dead points in an
//! order consistent with the sequential semantics of nested sampling.
//!
//! Transport is realized with one bounded `crossbeam_channel` pair per
//! worker thread: `try_recv` on the master side is the non-blocking
//! probe, `recv` on the worker side is its blocking wait.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::checkpoint::{CheckpointState, CheckpointStore};
use crate::config::Config;
use crate::error::{NestedSamplingError, Result};
use crate::evidence::EvidenceAccumulator;
use crate::feedback::{self, FeedbackLevel, StallTracker};
use crate::io;
use crate::point::{DaughterStatus, Point};
use crate::posterior::{PosteriorReservoir, ReservoirPolicy};
use crate::sampler::WithinContourSampler;
use crate::stack::LivePointStack;

/// Message sent master -> worker.
enum WorkerTask {
    Run(Point),
    End,
}

struct WorkerHandle {
    to_worker: Sender<WorkerTask>,
    from_worker: Receiver<Point>,
    busy: bool,
    join: Option<JoinHandle<()>>,
}

fn spawn_worker<S>(sampler: Arc<S>, mut rng: StdRng) -> WorkerHandle
where
    S: WithinContourSampler<StdRng> + Send + Sync + 'static,
{
    let (to_worker_tx, to_worker_rx) = bounded::<WorkerTask>(1);
    let (from_worker_tx, from_worker_rx) = bounded::<Point>(1);

    let join = thread::spawn(move || loop {
        match to_worker_rx.recv() {
            Ok(WorkerTask::Run(seed)) => {
                let baby = match sampler.sample(&seed, &mut rng) {
                    Ok(b) => b,
                    Err(e) => {
                        tracing::warn!(error = %e, "within-contour sampler failed; baby marked non-viable");
                        let mut b = seed.clone();
                        b.l0 = f64::NEG_INFINITY;
                        b
                    }
                };
                if from_worker_tx.send(baby).is_err() {
                    break;
                }
            }
            Ok(WorkerTask::End) | Err(_) => break,
        }
    });

    WorkerHandle {
        to_worker: to_worker_tx,
        from_worker: from_worker_rx,
        busy: false,
        join: Some(join),
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub ndead: u64,
    pub log_z: f64,
    pub log_z_error: f64,
    pub total_likelihood_calls: u64,
}

/// Master/worker scheduler. Owns the live-point stack, evidence
/// accumulator, and posterior reservoir; each worker thread owns its
/// own within-contour sampler instance.
pub struct Scheduler<S>
where
    S: WithinContourSampler<StdRng> + Send + Sync + 'static,
{
    stack: LivePointStack,
    evidence: EvidenceAccumulator,
    posterior: PosteriorReservoir,
    workers: Vec<WorkerHandle>,
    rng: StdRng,
    config: Config,
    total_likelihood_calls: u64,
    mean_likelihood_calls: f64,
    more_samples_needed: bool,
    stall_tracker: StallTracker,
    checkpoint: Option<CheckpointStore>,
    feedback_level: FeedbackLevel,
    promotions_since_feedback: usize,
    promotions_since_checkpoint: u64,
    dead_path: Option<PathBuf>,
    live_path: Option<PathBuf>,
    _sampler_marker: std::marker::PhantomData<S>,
}

impl<S> Scheduler<S>
where
    S: WithinContourSampler<StdRng> + Send + Sync + 'static,
{
    pub fn new(config: Config, sampler: Arc<S>) -> Result<Self> {
        config.validate()?;

        // `nprocs` counts the master plus its workers (the total MPI
        // rank count); the worker pool itself is `nprocs - 1`.
        let n_workers = config.nprocs.saturating_sub(1);
        let mut rng = StdRng::seed_from_u64(config.seed);
        let stack = LivePointStack::new(config.nlive, config.chain_length, config.n_dims, config.n_derived);
        let evidence = EvidenceAccumulator::new(config.nlive, config.precision_criterion, config.max_ndead);
        let posterior = PosteriorReservoir::new(
            config.posterior_capacity(),
            config.minimum_weight,
            config.reservoir_policy.unwrap_or(ReservoirPolicy::OverwriteFirst),
        );

        let mut workers = Vec::with_capacity(n_workers);
        for _ in 0..n_workers {
            let worker_seed = rng.next_u64();
            workers.push(spawn_worker(sampler.clone(), StdRng::seed_from_u64(worker_seed)));
        }

        let checkpoint = if config.write_resume {
            Some(CheckpointStore::new(config.resume_path()))
        } else {
            None
        };
        let dead_path = config.write_dead.then(|| config.dead_path());
        let live_path = config.write_live.then(|| config.phys_live_path());

        Ok(Scheduler {
            stack,
            evidence,
            posterior,
            workers,
            rng,
            feedback_level: FeedbackLevel(config.feedback),
            config,
            total_likelihood_calls: 0,
            mean_likelihood_calls: 0.0,
            more_samples_needed: true,
            stall_tracker: StallTracker::default(),
            checkpoint,
            promotions_since_feedback: 0,
            promotions_since_checkpoint: 0,
            dead_path,
            live_path,
            _sampler_marker: std::marker::PhantomData,
        })
    }

    /// Resume from an existing checkpoint rather than drawing a fresh
    /// initial population, then re-dispatch seeds from the restored
    /// live set exactly as the initial dispatch would.
    pub fn resume(config: Config, sampler: Arc<S>) -> Result<Self> {
        let mut scheduler = Self::new(config, sampler)?;
        let state = {
            let store = scheduler
                .checkpoint
                .as_ref()
                .ok_or_else(|| NestedSamplingError::Config("read_resume requires write_resume".into()))?;
            store.load()?
        };
        scheduler.stack = state.stack;
        scheduler.evidence = state.evidence;
        scheduler.total_likelihood_calls = state.total_likelihood_calls;
        scheduler.mean_likelihood_calls = state.mean_likelihood_calls;
        scheduler.posterior = state.posterior;
        scheduler.more_samples_needed = !scheduler.evidence.is_done();
        if scheduler.more_samples_needed {
            scheduler.initial_dispatch()?;
        }
        Ok(scheduler)
    }

    /// Populate the initial live set by uniform hypercube draws, then
    /// hand out exactly `nprocs - 1` seeds to the worker pool. Call
    /// this once before `run()` for a fresh start; skip it when resuming.
    pub fn populate_initial<P, L>(
        &mut self,
        evaluator: &crate::model::ModelEvaluator<P, L>,
    ) -> Result<()>
    where
        P: crate::prior::Prior,
        L: crate::model::Likelihood,
    {
        let n_dims = self.config.n_dims;
        self.stack.generate_initial(evaluator, n_dims, &mut self.rng)?;
        self.initial_dispatch()
    }

    fn initial_dispatch(&mut self) -> Result<()> {
        let n_workers = self.workers.len();
        for i in 0..n_workers {
            match self.generate_seed() {
                Some(seed) => {
                    self.workers[i].to_worker.send(WorkerTask::Run(seed)).ok();
                    self.workers[i].busy = true;
                }
                None => {
                    return Err(NestedSamplingError::Config(format!(
                        "nprocs - 1 ({}) too large for nlive ({}): no seed could be generated for initial dispatch",
                        n_workers, self.config.nlive
                    )));
                }
            }
        }
        Ok(())
    }

    /// `generate_seed`. Returns `None` ("BLANK") if no
    /// live-waiting mother, no blank daughter slot, or no eligible seed
    /// body could be found within the rejection budget; reservations
    /// made before the failure point are rolled back.
    fn generate_seed(&mut self) -> Option<Point> {
        let m = self.stack.lowest_waiting()?;
        let d = self.stack.claim_blank()?;

        self.stack.slot_mut(m).daughter = DaughterStatus::HasDaughter(d);
        let l_bound = self.stack.read(m).l0;
        self.stack.slot_mut(d).daughter = DaughterStatus::Gestating;

        match self.stack.draw_seed_body(l_bound, &mut self.rng) {
            Some(body_idx) => {
                let mut seed = self.stack.read(body_idx).clone();
                seed.l1 = l_bound;
                seed.daughter = DaughterStatus::HasDaughter(d);
                Some(seed)
            }
            None => {
                // Roll back: no seed body was found, the reservations
                // we just made must not stick.
                self.stack.slot_mut(m).daughter = DaughterStatus::Waiting;
                let n_dims = self.config.n_dims;
                let n_derived = self.config.n_derived;
                self.stack.write(d, Point::blank(n_dims, n_derived));
                None
            }
        }
    }

    /// Collect step: drain any ready babies into their pre-reserved slots.
    fn collect(&mut self) {
        for worker in self.workers.iter_mut() {
            if !worker.busy {
                continue;
            }
            if let Ok(mut baby) = worker.from_worker.try_recv() {
                // Every seed handed to a worker carries a `HasDaughter`
                // index reserved by `generate_seed`, and both
                // `RejectionSampler::sample` and the worker's own
                // error path preserve `daughter` unchanged on the way
                // back; a baby missing that index would mean a worker
                // violated the transport contract, not a user-code
                // failure, so it is contained rather than retried.
                match baby.daughter.daughter_index() {
                    Some(d) => {
                        baby.daughter = DaughterStatus::Waiting;
                        self.stack.write(d, baby);
                    }
                    None => {
                        tracing::error!("worker returned a baby with no reserved slot index; discarding");
                    }
                }
                worker.busy = false;
            }
        }
    }

    /// Promote step: advance dead points in strict `l0` order as long
    /// as the current lowest live point's daughter has arrived.
    fn promote(&mut self) {
        loop {
            let m = match self.stack.lowest_live() {
                Some(m) => m,
                None => break,
            };
            let daughter_idx = match self.stack.read(m).daughter.daughter_index() {
                Some(d) => d,
                None => break, // lowest point has no daughter dispatched yet
            };
            if !matches!(self.stack.read(daughter_idx).daughter, DaughterStatus::Waiting) {
                break; // daughter not arrived yet
            }

            let late = self.stack.read(m).clone();
            let baby_nlike = self.stack.read(daughter_idx).nlike;

            let n_dims = self.config.n_dims;
            let n_derived = self.config.n_derived;
            self.stack.write(m, Point::blank(n_dims, n_derived));

            let log_w = self.evidence.current_log_weight();
            self.evidence.update(late.l0, self.stack.mean_live_log_likelihood());

            self.total_likelihood_calls += baby_nlike;
            let ndead = self.evidence.ndead();

            if let Some(path) = &self.dead_path {
                if let Err(e) = io::append_dead(path, &late, ndead) {
                    tracing::warn!(error = %e, "dead-stream write failed; continuing");
                }
            }

            self.posterior
                .offer(late.l0, log_w, self.evidence.log_z, late.physical, late.derived);
            self.mean_likelihood_calls = if ndead == 0 {
                baby_nlike as f64
            } else {
                self.mean_likelihood_calls + (baby_nlike as f64 - self.mean_likelihood_calls) / ndead as f64
            };

            self.promotions_since_feedback += 1;
            if self.promotions_since_feedback >= self.config.nlive {
                feedback::report_progress(self.feedback_level, ndead, self.mean_likelihood_calls, &self.evidence);
                self.promotions_since_feedback = 0;
            }

            self.promotions_since_checkpoint += 1;
            if self.promotions_since_checkpoint >= self.config.update_resume_every() {
                self.checkpoint_now();
                self.write_live_snapshot();
                self.promotions_since_checkpoint = 0;
            }

            if self.evidence.is_done() {
                self.more_samples_needed = false;
                break;
            }
        }
    }

    fn checkpoint_now(&self) {
        if let Some(store) = &self.checkpoint {
            let state = CheckpointState {
                stack: self.stack.clone(),
                evidence: self.evidence.clone(),
                ndead: self.evidence.ndead(),
                mean_likelihood_calls: self.mean_likelihood_calls,
                total_likelihood_calls: self.total_likelihood_calls,
                posterior: self.posterior.clone(),
            };
            if let Err(e) = store.save(&state) {
                tracing::warn!(error = %e, "checkpoint write failed; continuing, next successful write supersedes");
            }
        }
    }

    fn write_live_snapshot(&self) {
        if let Some(path) = &self.live_path {
            let live: Vec<Point> = self
                .stack
                .iter()
                .filter(|p| p.daughter.is_live())
                .cloned()
                .collect();
            if let Err(e) = io::write_phys_live(path, live.into_iter()) {
                tracing::warn!(error = %e, "live-set snapshot write failed; continuing");
            }
        }
    }

    /// Dispatch step: hand idle workers a fresh seed each; on stall,
    /// warn (rate-limited) and stop dispatching for this iteration.
    fn dispatch(&mut self) {
        if !self.more_samples_needed {
            return;
        }
        let n_workers = self.workers.len();
        for i in 0..n_workers {
            if self.workers[i].busy {
                continue;
            }
            match self.generate_seed() {
                Some(seed) => {
                    feedback::report_dispatch_detail(self.feedback_level, i, seed.l1);
                    self.workers[i].to_worker.send(WorkerTask::Run(seed)).ok();
                    self.workers[i].busy = true;
                }
                None => {
                    self.stall_tracker.note_stall(self.evidence.ndead());
                    break;
                }
            }
        }
    }

    fn shutdown(&mut self) {
        for worker in self.workers.iter_mut() {
            if worker.busy {
                let _ = worker.from_worker.recv();
                worker.busy = false;
            }
        }
        for worker in self.workers.iter_mut() {
            let _ = worker.to_worker.send(WorkerTask::End);
        }
        for worker in self.workers.iter_mut() {
            if let Some(j) = worker.join.take() {
                let _ = j.join();
            }
        }
    }

    /// Run master steps (collect -> promote -> dispatch) until
    /// termination, then drain and shut the worker pool down.
    pub fn run(&mut self) -> Result<RunSummary> {
        while self.more_samples_needed {
            self.collect();
            self.promote();
            if !self.more_samples_needed {
                break;
            }
            self.dispatch();
            if !self.more_samples_needed {
                break;
            }
            thread::yield_now();
        }
        self.checkpoint_now();
        self.write_live_snapshot();
        self.shutdown();

        Ok(RunSummary {
            ndead: self.evidence.ndead(),
            log_z: self.evidence.log_z,
            log_z_error: self.evidence.log_z_error(),
            total_likelihood_calls: self.total_likelihood_calls,
        })
    }

    pub fn posterior(&self) -> &PosteriorReservoir {
        &self.posterior
    }

    pub fn evidence(&self) -> &EvidenceAccumulator {
        &self.evidence
    }

    pub fn stack(&self) -> &LivePointStack {
        &self.stack
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Likelihood, ModelEvaluator};
    use crate::prior::UniformBlock;
    use crate::sampler::RejectionSampler;

    #[derive(Clone)]
    struct ConstantLikelihood;
    impl Likelihood for ConstantLikelihood {
        type Context = ();
        fn log_likelihood(&self, _physical: &[f64], _derived_out: &mut [f64], _ctx: &()) -> f64 {
            0.0
        }
    }

    fn small_config() -> Config {
        Config {
            n_dims: 2,
            n_derived: 0,
            nlive: 20,
            chain_length: 2,
            nprocs: 2,
            precision_criterion: 1e-2,
            max_ndead: 200,
            write_resume: false,
            seed: 1234,
            nmax_posterior: 50,
            ..Config::default()
        }
    }

    fn make_sampler(cfg: &Config) -> Arc<RejectionSampler<UniformBlock, ConstantLikelihood>> {
        let evaluator = ModelEvaluator::new(
            UniformBlock::new(vec![0.0; cfg.n_dims], vec![1.0; cfg.n_dims]),
            ConstantLikelihood,
            (),
        );
        Arc::new(RejectionSampler::new(evaluator, cfg.n_dims, cfg.n_derived, 10_000))
    }

    #[test]
    fn end_to_end_constant_likelihood_terminates_with_logz_near_zero() {
        let cfg = small_config();
        let sampler = make_sampler(&cfg);
        let init_evaluator = ModelEvaluator::new(
            UniformBlock::new(vec![0.0; cfg.n_dims], vec![1.0; cfg.n_dims]),
            ConstantLikelihood,
            (),
        );
        let mut scheduler = Scheduler::new(cfg, sampler).unwrap();
        scheduler.populate_initial(&init_evaluator).unwrap();
        let summary = scheduler.run().unwrap();

        assert!(summary.ndead > 0);
        assert!(summary.log_z.is_finite());
        assert!(summary.log_z.abs() < 1.0, "logZ = {}", summary.log_z);
    }

    #[test]
    fn nprocs_minus_one_equal_to_nlive_minus_one_is_a_valid_boundary() {
        // nprocs - 1 == nlive - 1 is the tightest configuration
        // `Config::validate` still accepts (nprocs - 1 < nlive); the
        // worker pool (nprocs - 1) must fit inside the initial
        // population without exhausting every live-waiting mother.
        // A likelihood with genuine spread (rather than a tied
        // constant) is used so initial seed generation has candidate
        // bodies strictly above the bound to draw from.
        struct GradientLikelihood;
        impl Likelihood for GradientLikelihood {
            type Context = ();
            fn log_likelihood(&self, physical: &[f64], _derived_out: &mut [f64], _ctx: &()) -> f64 {
                -((physical[0] - 0.5).powi(2) + (physical[1] - 0.5).powi(2))
            }
        }

        let mut cfg = small_config();
        cfg.nlive = 4;
        cfg.nprocs = 4;

        let evaluator = ModelEvaluator::new(
            UniformBlock::new(vec![0.0; cfg.n_dims], vec![1.0; cfg.n_dims]),
            GradientLikelihood,
            (),
        );
        let sampler = Arc::new(RejectionSampler::new(evaluator, cfg.n_dims, cfg.n_derived, 50_000));
        let init_evaluator = ModelEvaluator::new(
            UniformBlock::new(vec![0.0; cfg.n_dims], vec![1.0; cfg.n_dims]),
            GradientLikelihood,
            (),
        );
        let mut scheduler = Scheduler::new(cfg, sampler).unwrap();
        scheduler.populate_initial(&init_evaluator).unwrap();
    }

    #[test]
    fn nprocs_too_large_for_nlive_is_a_fatal_config_error() {
        let mut cfg = small_config();
        cfg.nprocs = 25;
        let sampler = make_sampler(&cfg);
        let result = Scheduler::new(cfg.clone(), sampler);
        // Config::validate already rejects nprocs - 1 >= nlive at construction.
        assert!(result.is_err());
    }

    #[test]
    fn dead_sequence_is_non_decreasing_in_log_likelihood() {
        struct RampLikelihood;
        impl Likelihood for RampLikelihood {
            type Context = ();
            fn log_likelihood(&self, physical: &[f64], _derived_out: &mut [f64], _ctx: &()) -> f64 {
                -((physical[0] - 0.5).powi(2) + (physical[1] - 0.5).powi(2))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let mut cfg = small_config();
        cfg.max_ndead = 60;
        cfg.write_dead = true;
        cfg.base_dir = dir.path().to_path_buf();
        cfg.file_root = "ramp".to_string();

        let evaluator = ModelEvaluator::new(
            UniformBlock::new(vec![0.0; cfg.n_dims], vec![1.0; cfg.n_dims]),
            RampLikelihood,
            (),
        );
        let sampler = Arc::new(RejectionSampler::new(evaluator, cfg.n_dims, cfg.n_derived, 50_000));
        let init_evaluator = ModelEvaluator::new(
            UniformBlock::new(vec![0.0; cfg.n_dims], vec![1.0; cfg.n_dims]),
            RampLikelihood,
            (),
        );

        let mut scheduler = Scheduler::new(cfg.clone(), sampler).unwrap();
        scheduler.populate_initial(&init_evaluator).unwrap();
        let summary = scheduler.run().unwrap();
        assert!(summary.ndead > 0);

        let contents = std::fs::read_to_string(cfg.dead_path()).unwrap();
        let mut last = f64::NEG_INFINITY;
        let mut count = 0;
        for line in contents.lines() {
            let log_l: f64 = line.split_whitespace().nth(1).unwrap().parse().unwrap();
            assert!(log_l >= last, "dead sequence decreased: {log_l} < {last}");
            last = log_l;
            count += 1;
        }
        assert_eq!(count as u64, summary.ndead);
    }
}
