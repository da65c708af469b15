use serde::{Deserialize, Serialize};
use std::io;

use crate::error::MacError;

/// One evaluated point of a curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub x: f64,
    pub y: f64,
}

/// A named series of values indexed by a grid (energy use, abatement or price).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    name: String,
    index_name: String,
    points: Vec<CurvePoint>,
}

impl Curve {
    pub fn new(name: impl Into<String>, index_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index_name: index_name.into(),
            points: Vec::new(),
        }
    }

    /// Build a curve by evaluating `f` at every grid point.
    pub fn from_fn<F>(name: &str, index_name: &str, grid: &[f64], f: F) -> Self
    where
        F: Fn(f64) -> f64,
    {
        let points = grid.iter().map(|&x| CurvePoint { x, y: f(x) }).collect();
        Self {
            name: name.to_string(),
            index_name: index_name.to_string(),
            points,
        }
    }

    pub fn push(&mut self, x: f64, y: f64) {
        self.points.push(CurvePoint { x, y });
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Value at an exact grid point, if present.
    pub fn value_at(&self, x: f64) -> Option<f64> {
        self.points.iter().find(|p| p.x == x).map(|p| p.y)
    }

    /// Pointwise combination of two curves sharing the same grid.
    pub fn zip_with<F>(&self, other: &Curve, name: &str, f: F) -> Result<Curve, MacError>
    where
        F: Fn(f64, f64) -> f64,
    {
        if self.len() != other.len() {
            return Err(MacError::InvalidGrid(format!(
                "cannot combine '{}' ({} points) with '{}' ({} points)",
                self.name,
                self.len(),
                other.name,
                other.len()
            )));
        }
        let mut out = Curve::new(name, self.index_name.clone());
        for (a, b) in self.points.iter().zip(other.points.iter()) {
            if a.x != b.x {
                return Err(MacError::InvalidGrid(format!(
                    "grid mismatch at {} vs {}",
                    a.x, b.x
                )));
            }
            out.push(a.x, f(a.y, b.y));
        }
        Ok(out)
    }

    /// Write the curve as a two-column CSV table (`index_name`, `name`).
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), MacError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record([self.index_name.as_str(), self.name.as_str()])?;
        for p in &self.points {
            wtr.write_record([p.x.to_string(), p.y.to_string()])?;
        }
        wtr.flush().map_err(|e| MacError::Export(e.to_string()))?;
        Ok(())
    }
}

/// `n` evenly spaced values from `lo` to `hi` inclusive.
pub fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![lo],
        _ => {
            let step = (hi - lo) / (n - 1) as f64;
            (0..n).map(|i| lo + step * i as f64).collect()
        }
    }
}

/// Energy grids must be finite and strictly positive (E^(α-1) diverges at zero).
pub fn check_energy_grid(grid: &[f64]) -> Result<(), MacError> {
    if grid.is_empty() {
        return Err(MacError::InvalidGrid("grid is empty".to_string()));
    }
    if let Some(bad) = grid.iter().find(|e| !e.is_finite() || **e <= 0.0) {
        return Err(MacError::InvalidGrid(format!(
            "energy use must be positive and finite, got {}",
            bad
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linspace_endpoints() {
        let g = linspace(0.1, 1.0, 10);
        assert_eq!(g.len(), 10);
        assert!((g[0] - 0.1).abs() < 1e-12);
        assert!((g[9] - 1.0).abs() < 1e-12);
        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(2.0, 5.0, 1), vec![2.0]);
    }

    #[test]
    fn test_check_energy_grid_rejects_zero() {
        assert!(check_energy_grid(&[0.0, 0.5]).is_err());
        assert!(check_energy_grid(&[]).is_err());
        assert!(check_energy_grid(&[f64::NAN]).is_err());
        assert!(check_energy_grid(&[0.1, 0.5]).is_ok());
    }

    #[test]
    fn test_zip_with_requires_same_grid() {
        let a = Curve::from_fn("a", "E", &[1.0, 2.0], |x| x);
        let b = Curve::from_fn("b", "E", &[1.0, 3.0], |x| x);
        assert!(a.zip_with(&b, "c", |x, y| x + y).is_err());

        let c = Curve::from_fn("c", "E", &[1.0, 2.0], |x| 2.0 * x);
        let sum = a.zip_with(&c, "sum", |x, y| x + y).unwrap();
        assert_eq!(sum.value_at(2.0), Some(6.0));
    }

    #[test]
    fn test_write_csv() {
        let curve = Curve::from_fn("M", "E", &[1.0, 2.0], |x| 0.25 * x);
        let mut buf = Vec::new();
        curve.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("E,M"));
        assert_eq!(lines.next(), Some("1,0.25"));
        assert_eq!(lines.next(), Some("2,0.5"));
    }
}
