// src/processing/dfilter/export.rs
//! Writing simulation results to text files

use super::simulator::SimulationPoint;
use crate::config::constants::simulation::DEFAULT_EXPORT_DELIMITER;
use crate::error::{ErrorKind, GsvError, GsvResult};
use crate::error_context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Output format for simulation points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Header line, then one `x<d>y[<d>phase]` record per point
    Delimited { delimiter: char },
    /// JSON array of points
    Json,
}

impl Default for ExportFormat {
    fn default() -> Self {
        ExportFormat::Delimited {
            delimiter: DEFAULT_EXPORT_DELIMITER,
        }
    }
}

/// Write points in increasing `x` order
pub fn write_points<W: Write>(writer: &mut W, points: &[SimulationPoint], format: ExportFormat) -> GsvResult<()> {
    let mut ordered: Vec<&SimulationPoint> = points.iter().collect();
    ordered.sort_by(|a, b| a.x.total_cmp(&b.x));

    match format {
        ExportFormat::Delimited { delimiter } => {
            let with_phase = ordered.iter().any(|p| p.phase.is_some());
            if with_phase {
                writeln!(writer, "x{d}y{d}phase", d = delimiter)?;
            } else {
                writeln!(writer, "x{}y", delimiter)?;
            }
            for point in ordered {
                match point.phase {
                    Some(phase) if with_phase => {
                        writeln!(writer, "{}{d}{}{d}{}", point.x, point.y, phase, d = delimiter)?
                    }
                    _ => writeln!(writer, "{}{}{}", point.x, delimiter, point.y)?,
                }
            }
        }
        ExportFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, &ordered).map_err(|e| {
                GsvError::new(ErrorKind::Io, error_context!("export", "write_points"), e.to_string())
            })?;
            writeln!(writer)?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Write points to a file, replacing it
pub fn save_points(path: impl AsRef<Path>, points: &[SimulationPoint], format: ExportFormat) -> GsvResult<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| {
        GsvError::new(
            ErrorKind::Io,
            error_context!("export", "save_points"),
            format!("{}: {}", path.display(), e),
        )
    })?;
    let mut writer = BufWriter::new(file);
    write_points(&mut writer, points, format)?;
    debug!(path = %path.display(), points = points.len(), "Simulation exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f64, y: f64, phase: Option<f64>) -> SimulationPoint {
        SimulationPoint { x, y, phase }
    }

    #[test]
    fn test_delimited_sorted_by_x() {
        let points = [point(2.0, 0.5, None), point(0.0, 1.0, None), point(1.0, 0.75, None)];
        let mut out = Vec::new();
        write_points(&mut out, &points, ExportFormat::default()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "x;y\n0;1\n1;0.75\n2;0.5\n");
    }

    #[test]
    fn test_delimited_with_phase() {
        let points = [point(10.0, 0.5, Some(-0.25))];
        let mut out = Vec::new();
        write_points(&mut out, &points, ExportFormat::Delimited { delimiter: '\t' }).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "x\ty\tphase\n10\t0.5\t-0.25\n");
    }

    #[test]
    fn test_json_export() {
        let points = [point(1.0, 2.0, None)];
        let mut out = Vec::new();
        write_points(&mut out, &points, ExportFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed[0]["x"], 1.0);
        assert!(parsed[0].get("phase").is_none());
    }
}
