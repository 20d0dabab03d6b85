//! Run configuration (ambient stack): mirrors the full entry-point
//! argument list field-for-field, loadable from the CLI via `clap` or
//! from a config file via `serde`.

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::{NestedSamplingError, Result};
use crate::posterior::ReservoirPolicy;

/// Full run configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "nested_sampler", about = "Parallel nested sampling engine")]
pub struct Config {
    /// Number of physical dimensions.
    #[arg(long, default_value_t = 2)]
    pub n_dims: usize,

    /// Number of derived parameters the likelihood writes.
    #[arg(long, default_value_t = 0)]
    pub n_derived: usize,

    /// Target live population size.
    #[arg(long, default_value_t = 500)]
    pub nlive: usize,

    /// Chain length multiplier used to size the stack (`nstack = nlive
    /// * chain_length * 2`, minimum `2 * nlive`).
    #[arg(long, default_value_t = 1)]
    pub chain_length: usize,

    /// Number of within-contour sampler repeats per point (forwarded
    /// to the concrete sampler; the core only passes it through).
    #[arg(long, default_value_t = 1)]
    pub num_repeats: usize,

    /// Total process count including the master; the worker pool is
    /// `nprocs - 1` (`nprocs - 1` must be `< nlive`).
    #[arg(long, default_value_t = 2)]
    pub nprocs: usize,

    /// Accepted but not yet implemented beyond a single cluster; see
    /// DESIGN.md.
    #[arg(long, default_value_t = false)]
    pub do_clustering: bool,

    /// Feedback verbosity: 0 = silent, 1 = promotion summaries, 2 = per-event detail.
    #[arg(long, default_value_t = 1)]
    pub feedback: u8,

    /// Stopping precision: terminate when the live set's remaining
    /// contribution to `logZ` drops below this fraction of the total.
    #[arg(long, default_value_t = 1e-3)]
    pub precision_criterion: f64,

    /// Maximum number of dead points; `0` means unbounded.
    #[arg(long, default_value_t = 0)]
    pub max_ndead: u64,

    /// Oversampling factor applied to the posterior reservoir capacity.
    #[arg(long, default_value_t = 1)]
    pub boost_posterior: usize,

    /// Write `<file_root>.txt` posterior samples.
    #[arg(long, default_value_t = true)]
    pub posteriors: bool,

    /// Collapse weighted samples to equally-weighted ("equals") output.
    #[arg(long, default_value_t = false)]
    pub equals: bool,

    /// Accepted but not yet implemented beyond a single cluster; see
    /// DESIGN.md.
    #[arg(long, default_value_t = false)]
    pub cluster_posteriors: bool,

    /// Write `<file_root>.resume` checkpoints.
    #[arg(long, default_value_t = true)]
    pub write_resume: bool,

    /// Write `<file_root>.paramnames`.
    #[arg(long, default_value_t = true)]
    pub write_paramnames: bool,

    /// Resume from an existing `<file_root>.resume` if present.
    #[arg(long, default_value_t = false)]
    pub read_resume: bool,

    /// Write `<file_root>.stats` on completion.
    #[arg(long, default_value_t = true)]
    pub write_stats: bool,

    /// Write `<file_root>_phys_live.txt` alongside checkpoints.
    #[arg(long, default_value_t = false)]
    pub write_live: bool,

    /// Write `<file_root>_dead.txt` as a running death stream.
    #[arg(long, default_value_t = false)]
    pub write_dead: bool,

    /// Promotions between checkpoint/file updates.
    #[arg(long, default_value_t = 0)]
    pub update_files: u64,

    /// Directory all output files are written under.
    #[arg(long, default_value = ".")]
    pub base_dir: PathBuf,

    /// Filename stem for all output files.
    #[arg(long, default_value = "run")]
    pub file_root: String,

    /// Master RNG seed; fixing it makes a single-worker run reproducible.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Posterior reservoir capacity; `0` derives it from `nlive * boost_posterior`.
    #[arg(long, default_value_t = 0)]
    pub nmax_posterior: usize,

    /// Minimum normalized weight a dead point must clear to enter the
    /// posterior reservoir.
    #[arg(long, default_value_t = 1e-3)]
    pub minimum_weight: f64,

    #[arg(skip)]
    pub reservoir_policy: Option<ReservoirPolicy>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            n_dims: 2,
            n_derived: 0,
            nlive: 500,
            chain_length: 1,
            num_repeats: 1,
            nprocs: 2,
            do_clustering: false,
            feedback: 1,
            precision_criterion: 1e-3,
            max_ndead: 0,
            boost_posterior: 1,
            posteriors: true,
            equals: false,
            cluster_posteriors: false,
            write_resume: true,
            write_paramnames: true,
            read_resume: false,
            write_stats: true,
            write_live: false,
            write_dead: false,
            update_files: 0,
            base_dir: PathBuf::from("."),
            file_root: "run".to_string(),
            seed: 0,
            nmax_posterior: 0,
            minimum_weight: 1e-3,
            reservoir_policy: None,
        }
    }
}

impl Config {
    pub fn posterior_capacity(&self) -> usize {
        if self.nmax_posterior > 0 {
            self.nmax_posterior
        } else {
            self.nlive * self.boost_posterior.max(1)
        }
    }

    pub fn update_resume_every(&self) -> u64 {
        if self.update_files > 0 {
            self.update_files
        } else {
            self.nlive as u64
        }
    }

    /// Fatal configuration checks run once at startup.
    pub fn validate(&self) -> Result<()> {
        if self.n_dims == 0 {
            return Err(NestedSamplingError::Config("n_dims must be > 0".into()));
        }
        if self.nlive == 0 {
            return Err(NestedSamplingError::Config("nlive must be > 0".into()));
        }
        if self.nprocs == 0 {
            return Err(NestedSamplingError::Config("nprocs must be >= 1".into()));
        }
        if self.nprocs.saturating_sub(1) >= self.nlive {
            return Err(NestedSamplingError::Config(format!(
                "nprocs - 1 ({}) must be < nlive ({})",
                self.nprocs - 1,
                self.nlive
            )));
        }
        if self.precision_criterion <= 0.0 {
            return Err(NestedSamplingError::Config(
                "precision_criterion must be > 0".into(),
            ));
        }
        if self.posterior_capacity() == 0 {
            return Err(NestedSamplingError::Config(
                "nmax_posterior must be > 0".into(),
            ));
        }
        if self.read_resume && !self.write_resume {
            return Err(NestedSamplingError::Config(
                "read_resume requires write_resume to be enabled".into(),
            ));
        }
        Ok(())
    }

    pub fn resume_path(&self) -> PathBuf {
        self.base_dir.join(format!("{}.resume", self.file_root))
    }

    pub fn posterior_path(&self) -> PathBuf {
        self.base_dir.join(format!("{}.txt", self.file_root))
    }

    pub fn stats_path(&self) -> PathBuf {
        self.base_dir.join(format!("{}.stats", self.file_root))
    }

    pub fn phys_live_path(&self) -> PathBuf {
        self.base_dir.join(format!("{}_phys_live.txt", self.file_root))
    }

    pub fn dead_path(&self) -> PathBuf {
        self.base_dir.join(format!("{}_dead.txt", self.file_root))
    }

    pub fn paramnames_path(&self) -> PathBuf {
        self.base_dir.join(format!("{}.paramnames", self.file_root))
    }
}
