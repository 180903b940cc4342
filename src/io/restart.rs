//! ASCII restart files.
//!
//! # File Format
//!
//! ```text
//! "PointID"	"x"	"y"	"Pressure"	"Velocity_x"	"Velocity_y"	"Temperature"
//! 0	0.000000000000000e0	0.000000000000000e0	1.013250000000000e5	...
//! 1	...
//! ```
//!
//! One tab-separated row per owned point: global index, coordinates, then the
//! solved variables. Reading skips the coordinates and maps rows to points by
//! global index; every owned point must appear.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::mesh::DualMesh;
use crate::solver::FlowState;
use crate::types::PointIndex;

/// Error type for restart files.
#[derive(Debug, Error)]
pub enum RestartError {
    /// The file does not exist
    #[error("Restart file not found: {0}")]
    MissingFile(PathBuf),

    /// Column names differ from what this run writes
    #[error("Restart header mismatch: expected {expected:?}, found {found:?}")]
    HeaderMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// A data row has the wrong number of columns
    #[error("Line {line}: expected {expected} columns, found {found}")]
    ColumnCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// A row refers to a point this mesh does not have
    #[error("Line {line}: unknown global point index {index}")]
    UnknownIndex { line: usize, index: usize },

    /// Owned points without a row
    #[error("{missing} of {expected} points missing from the restart file")]
    MissingPoints { missing: usize, expected: usize },

    /// A value could not be parsed
    #[error("Parse error at line {line}: '{value}'")]
    Parse { line: usize, value: String },

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Column names of a restart file in `n_dim` dimensions.
pub fn column_names(n_dim: usize) -> Vec<String> {
    let axes = ["x", "y", "z"];
    let mut names = vec!["PointID".to_string()];
    names.extend(axes[..n_dim].iter().map(|a| a.to_string()));
    names.push("Pressure".to_string());
    names.extend(axes[..n_dim].iter().map(|a| format!("Velocity_{a}")));
    names.push("Temperature".to_string());
    names
}

/// Write the owned points of `state` to `path`.
pub fn write_restart(path: &Path, mesh: &DualMesh, state: &FlowState) -> Result<(), RestartError> {
    let n_dim = mesh.n_dim();
    let mut out = BufWriter::new(File::create(path)?);

    let header: Vec<String> = column_names(n_dim).iter().map(|n| format!("\"{n}\"")).collect();
    writeln!(out, "{}", header.join("\t"))?;

    let mut rows = 0;
    for p in (0..mesh.n_point()).filter(|&p| mesh.is_domain(p)) {
        write!(out, "{}", mesh.global_index(PointIndex::new(p)))?;
        for x in &mesh.coord(p)[..n_dim] {
            write!(out, "\t{x:.15e}")?;
        }
        for v in state.solution(p) {
            write!(out, "\t{v:.15e}")?;
        }
        writeln!(out)?;
        rows += 1;
    }
    out.flush()?;

    info!(path = %path.display(), points = rows, "restart written");
    Ok(())
}

fn parse(value: &str, line: usize) -> Result<f64, RestartError> {
    value.parse().map_err(|_| RestartError::Parse {
        line,
        value: value.to_string(),
    })
}

/// Read a restart file into `state`.
///
/// Thermodynamic and transport properties are not stored; refresh them with
/// [`FlowState::update_primitives`] afterwards.
pub fn read_restart(path: &Path, mesh: &DualMesh, state: &mut FlowState) -> Result<(), RestartError> {
    if !path.exists() {
        return Err(RestartError::MissingFile(path.to_path_buf()));
    }
    let n_dim = mesh.n_dim();
    let n_var = state.layout().n_var();
    let expected = column_names(n_dim);
    let reader = BufReader::new(File::open(path)?);

    let mut found = vec![false; mesh.n_point()];
    let mut values = vec![0.0; n_var];
    let mut header_seen = false;

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        let line = line.trim();
        let line_no = line_num + 1;
        if line.is_empty() {
            continue;
        }

        let columns: Vec<&str> = line.split('\t').map(str::trim).collect();
        if !header_seen {
            let names: Vec<String> = columns.iter().map(|c| c.trim_matches('"').to_string()).collect();
            if names != expected {
                return Err(RestartError::HeaderMismatch {
                    expected,
                    found: names,
                });
            }
            header_seen = true;
            continue;
        }

        if columns.len() != expected.len() {
            return Err(RestartError::ColumnCount {
                line: line_no,
                expected: expected.len(),
                found: columns.len(),
            });
        }
        let index: usize = columns[0].parse().map_err(|_| RestartError::Parse {
            line: line_no,
            value: columns[0].to_string(),
        })?;
        let point = mesh
            .local_index(index)
            .ok_or(RestartError::UnknownIndex { line: line_no, index })?
            .get();

        for (v, text) in values.iter_mut().zip(&columns[1 + n_dim..]) {
            *v = parse(text, line_no)?;
        }
        state.set_solution(point, &values);
        found[point] = true;
    }

    let owned = mesh.n_point_domain();
    let missing = (0..mesh.n_point())
        .filter(|&p| mesh.is_domain(p) && !found[p])
        .count();
    if missing > 0 {
        return Err(RestartError::MissingPoints {
            missing,
            expected: owned,
        });
    }

    info!(path = %path.display(), points = owned, "restart read");
    Ok(())
}
