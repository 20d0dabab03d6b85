//! Error taxonomy for the sampler core.

use std::path::PathBuf;
use thiserror::Error;

/// All the ways the engine can fail, split by the propagation rules of
/// the design: configuration and checkpoint corruption surface to the
/// caller, everything else is contained within the iteration that
/// produced it.
#[derive(Debug, Error)]
pub enum NestedSamplingError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("resume file at {path:?} is corrupt: {reason}")]
    ResumeCorruption { path: PathBuf, reason: String },

    #[error("prior transform received an out-of-range hypercube coordinate: {0}")]
    PriorDomain(String),

    #[error("I/O failure writing {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, NestedSamplingError>;
