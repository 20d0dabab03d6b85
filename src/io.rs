//! Filesystem surface under `base_dir`. The byte layout for the output
//! files isn't fixed by any external format; this module fixes a
//! concrete, minimal layout: whitespace-separated columns, one sample
//! per line.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{NestedSamplingError, Result};
use crate::evidence::EvidenceAccumulator;
use crate::point::Point;
use crate::posterior::PosteriorReservoir;

fn open(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).map_err(|e| NestedSamplingError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(BufWriter::new(file))
}

fn write_row(w: &mut impl Write, path: &Path, cols: &[f64]) -> Result<()> {
    let line = cols
        .iter()
        .map(|x| format!("{:.8e}", x))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(w, "{line}").map_err(|e| NestedSamplingError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// `<file_root>.txt`: one posterior row per line, `weight logL physical... derived...`.
/// Weight is normalized by `log_z_final`.
pub fn write_posterior(path: &Path, reservoir: &PosteriorReservoir, log_z_final: f64) -> Result<()> {
    let mut w = open(path)?;
    for row in reservoir.rows() {
        let weight = (row.log_weight - log_z_final).exp();
        let mut cols = vec![weight, row.log_l];
        cols.extend_from_slice(&row.physical);
        cols.extend_from_slice(&row.derived);
        write_row(&mut w, path, &cols)?;
    }
    Ok(())
}

/// `<file_root>_phys_live.txt`: current live set, one point per line.
pub fn write_phys_live(path: &Path, live: impl Iterator<Item = Point>) -> Result<()> {
    let mut w = open(path)?;
    for p in live {
        let mut cols = p.physical.clone();
        cols.extend_from_slice(&p.derived);
        cols.push(p.l0);
        write_row(&mut w, path, &cols)?;
    }
    Ok(())
}

/// `<file_root>_dead.txt`: running death stream, appended to across the run.
pub fn append_dead(path: &Path, point: &Point, ndead: u64) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| NestedSamplingError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
    let mut w = BufWriter::new(file);
    let mut cols = vec![ndead as f64, point.l0];
    cols.extend_from_slice(&point.physical);
    cols.extend_from_slice(&point.derived);
    write_row(&mut w, path, &cols)
}

/// `<file_root>.stats`: final summary.
pub fn write_stats(path: &Path, evidence: &EvidenceAccumulator, total_likelihood_calls: u64) -> Result<()> {
    let mut w = open(path)?;
    writeln!(
        w,
        "log(Z) = {:.6} +/- {:.6}",
        evidence.log_z,
        evidence.log_z_error()
    )
    .map_err(|e| NestedSamplingError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    writeln!(w, "ndead = {}", evidence.ndead()).map_err(|e| NestedSamplingError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    writeln!(w, "total likelihood calls = {total_likelihood_calls}").map_err(|e| NestedSamplingError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

/// `<file_root>.paramnames`: one name per physical/derived parameter,
/// defaulting to `p0, p1, ...` / `d0, d1, ...` when none are supplied.
pub fn write_paramnames(path: &Path, n_dims: usize, n_derived: usize, names: Option<&[String]>) -> Result<()> {
    let mut w = open(path)?;
    let default_names: Vec<String> = (0..n_dims)
        .map(|i| format!("p{i}"))
        .chain((0..n_derived).map(|i| format!("d{i}")))
        .collect();
    let names = names.unwrap_or(&default_names);
    for name in names {
        writeln!(w, "{name}").map_err(|e| NestedSamplingError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posterior::{PosteriorReservoir, ReservoirPolicy};

    #[test]
    fn write_posterior_normalizes_by_final_log_z() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.txt");
        let mut res = PosteriorReservoir::new(4, 1e-12, ReservoirPolicy::GrowFirst);
        res.offer(0.0, 0.0, 0.0, vec![1.0, 2.0], vec![0.5]);
        write_posterior(&path, &res, 0.0).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let first_line = contents.lines().next().unwrap();
        let cols: Vec<f64> = first_line.split_whitespace().map(|s| s.parse().unwrap()).collect();
        assert!((cols[0] - 1.0).abs() < 1e-6); // weight = exp(0 - 0) = 1
        assert_eq!(cols.len(), 5); // weight, logL, 2 physical, 1 derived
    }

    #[test]
    fn write_paramnames_defaults_when_none_supplied() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.paramnames");
        write_paramnames(&path, 2, 1, None).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec!["p0", "p1", "d0"]);
    }
}
