//! Checkpoint store (C9): atomic persistence and resume of the full
//! sampler state.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NestedSamplingError, Result};
use crate::evidence::EvidenceAccumulator;
use crate::posterior::PosteriorReservoir;
use crate::stack::LivePointStack;

/// Everything a checkpoint must persist: the full stack
/// array, evidence state, dead-point count, the likelihood-call
/// counters, and the posterior reservoir rows `[0, nposterior)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointState {
    pub stack: LivePointStack,
    pub evidence: EvidenceAccumulator,
    pub ndead: u64,
    pub mean_likelihood_calls: f64,
    pub total_likelihood_calls: u64,
    pub posterior: PosteriorReservoir,
}

/// Write-to-temp/fsync/rename persistence so a crash never leaves a
/// half-written resume file behind.
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: PathBuf) -> Self {
        CheckpointStore { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize `state` and atomically replace the checkpoint file.
    pub fn save(&self, state: &CheckpointState) -> Result<()> {
        let json = serde_json::to_vec_pretty(state).map_err(|e| NestedSamplingError::Io {
            path: self.path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let tmp_path = dir.join(format!(
            ".{}.tmp",
            self.path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "resume".to_string())
        ));

        let mut tmp = File::create(&tmp_path).map_err(|e| NestedSamplingError::Io {
            path: tmp_path.clone(),
            source: e,
        })?;
        tmp.write_all(&json).map_err(|e| NestedSamplingError::Io {
            path: tmp_path.clone(),
            source: e,
        })?;
        tmp.sync_all().map_err(|e| NestedSamplingError::Io {
            path: tmp_path.clone(),
            source: e,
        })?;
        drop(tmp);

        fs::rename(&tmp_path, &self.path).map_err(|e| NestedSamplingError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        Ok(())
    }

    /// Load and sanitize a checkpoint: any `GESTATING` slot is
    /// canceled (reblanked, mother reset to `Waiting`) since no worker
    /// survives a restart to finish producing it.
    pub fn load(&self) -> Result<CheckpointState> {
        let bytes = fs::read(&self.path).map_err(|e| NestedSamplingError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        let mut state: CheckpointState =
            serde_json::from_slice(&bytes).map_err(|e| NestedSamplingError::ResumeCorruption {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        state.stack.cancel_gestating();
        Ok(state)
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}
