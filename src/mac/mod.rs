//! Marginal Abatement Cost (MAC) model
//!
//! A single polluting activity uses energy `E` with concave benefit `γ·E^α`
//! at energy price `pe`. Emissions are proportional to energy use (`M = ϕ·E`)
//! and cause quadratic damages `D(M) = γd·M²/2`.
//!
//! The model exposes the closed-form cost, emission and damage functions, the
//! marginal abatement cost, the unregulated optimum `E0` and the social optimum
//! `Eopt`, which is found by a bracketed root solve.

pub mod curve;
pub mod root;
pub mod tech;

pub use curve::{check_energy_grid, linspace, Curve, CurvePoint};
pub use tech::{MacTech, TechInput, Technology};

use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::Validate;

use crate::error::MacError;

/// Structural parameters of the MAC model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct MacParams {
    /// Curvature of the benefit of energy use
    #[validate(range(exclusive_min = 0.0, exclusive_max = 1.0))]
    pub alpha: f64,
    /// Scale of the benefit of energy use
    #[validate(range(exclusive_min = 0.0))]
    pub gamma: f64,
    /// Energy price
    #[validate(range(exclusive_min = 0.0))]
    pub pe: f64,
    /// Emission intensity of energy use
    #[validate(range(exclusive_min = 0.0))]
    pub phi: f64,
    /// Slope of marginal damages
    #[validate(range(min = 0.0))]
    pub gamma_d: f64,
}

impl Default for MacParams {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            gamma: 1.0,
            pe: 1.0,
            phi: 0.25,
            gamma_d: 100.0,
        }
    }
}

impl MacParams {
    pub fn check(&self) -> Result<(), MacError> {
        for (name, value) in [
            ("alpha", self.alpha),
            ("gamma", self.gamma),
            ("pe", self.pe),
            ("phi", self.phi),
            ("gamma_d", self.gamma_d),
        ] {
            if !value.is_finite() {
                return Err(MacError::InvalidParameter(format!(
                    "{name} is not finite: {value}"
                )));
            }
        }
        self.validate()?;
        Ok(())
    }
}

/// The base MAC model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacModel {
    params: MacParams,
}

impl Default for MacModel {
    fn default() -> Self {
        Self {
            params: MacParams::default(),
        }
    }
}

impl MacModel {
    pub fn new(params: MacParams) -> Result<Self, MacError> {
        params.check()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &MacParams {
        &self.params
    }

    /// Replace the parameters, keeping the old ones if the new set is invalid.
    pub fn set_params(&mut self, params: MacParams) -> Result<(), MacError> {
        params.check()?;
        self.params = params;
        Ok(())
    }

    /// Private net benefit `C(E) = γ·E^α − pe·E` over an energy grid.
    pub fn cost(&self, grid: &[f64]) -> Result<Curve, MacError> {
        check_energy_grid(grid)?;
        Ok(Curve::from_fn("C", "E", grid, |e| self.c0(e)))
    }

    /// Emissions `M(E) = ϕ·E` over an energy grid.
    pub fn emissions(&self, grid: &[f64]) -> Result<Curve, MacError> {
        check_energy_grid(grid)?;
        Ok(Curve::from_fn("M", "E", grid, |e| self.m0(e)))
    }

    /// Net welfare `C̃(E) = C(E) − D(M(E))` over an energy grid.
    pub fn ctilde(&self, grid: &[f64]) -> Result<Curve, MacError> {
        let c = self.cost(grid)?;
        let d = Curve::from_fn("D", "E", grid, |e| self.damage(self.m0(e)));
        c.zip_with(&d, "Ctilde", |c, d| c - d)
    }

    /// Marginal abatement cost per unit of emissions at energy use `e`.
    pub fn mac(&self, e: f64) -> f64 {
        let p = &self.params;
        (p.gamma * p.alpha * e.powf(p.alpha - 1.0) - p.pe) / p.phi
    }

    /// Damages `D(M) = γd·M²/2`.
    pub fn damage(&self, m: f64) -> f64 {
        self.params.gamma_d * m * m / 2.0
    }

    /// Marginal damages `D'(M) = γd·M`.
    pub fn marginal_damage(&self, m: f64) -> f64 {
        self.params.gamma_d * m
    }

    /// Unregulated energy use, where marginal benefit equals the energy price.
    pub fn e0(&self) -> f64 {
        let p = &self.params;
        (p.gamma * p.alpha / p.pe).powf(1.0 / (1.0 - p.alpha))
    }

    pub fn c0(&self, e: f64) -> f64 {
        let p = &self.params;
        p.gamma * e.powf(p.alpha) - p.pe * e
    }

    pub fn m0(&self, e: f64) -> f64 {
        self.params.phi * e
    }

    /// Socially optimal energy use: `α·γ·E^(α−1) − pe − γd·ϕ²·E = 0`.
    ///
    /// The residual is strictly decreasing, positive near zero and non-positive
    /// at `E0`, so the root is bracketed in `(0, E0]`.
    pub fn e_opt(&self) -> Result<f64, MacError> {
        let p = self.params;
        let e0 = self.e0();
        if p.gamma_d == 0.0 {
            return Ok(e0);
        }
        let residual =
            move |e: f64| p.alpha * p.gamma * e.powf(p.alpha - 1.0) - p.pe - p.gamma_d * p.phi * p.phi * e;
        let e = root::find_root(residual, e0 * 1e-12, e0)?;
        debug!(e_opt = e, e0, "solved social optimum");
        Ok(e)
    }

    pub fn c_opt(&self) -> Result<f64, MacError> {
        Ok(self.c0(self.e_opt()?))
    }

    pub fn m_opt(&self) -> Result<f64, MacError> {
        Ok(self.m0(self.e_opt()?))
    }

    /// MAC as a function of abatement `A = M(E0) − M(E)`.
    ///
    /// Grid points above `E0` imply negative abatement and are dropped.
    pub fn mac_curve(&self, grid: &[f64]) -> Result<Curve, MacError> {
        check_energy_grid(grid)?;
        let m_base = self.m0(self.e0());
        let mut curve = Curve::new("MAC", "A");
        for &e in grid.iter().filter(|&&e| e <= self.e0()) {
            curve.push(m_base - self.m0(e), self.mac(e));
        }
        Ok(curve)
    }

    /// Summary of the unregulated and optimal outcomes.
    pub fn outcome(&self) -> Result<MacOutcome, MacError> {
        let e0 = self.e0();
        let e_opt = self.e_opt()?;
        let m_opt = self.m0(e_opt);
        Ok(MacOutcome {
            e0,
            c0: self.c0(e0),
            m0: self.m0(e0),
            e_opt,
            c_opt: self.c0(e_opt),
            m_opt,
            abatement: self.m0(e0) - m_opt,
            price: self.marginal_damage(m_opt),
        })
    }
}

/// Unregulated versus socially optimal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacOutcome {
    pub e0: f64,
    pub c0: f64,
    pub m0: f64,
    pub e_opt: f64,
    pub c_opt: f64,
    pub m_opt: f64,
    pub abatement: f64,
    /// Emission price supporting the optimum (marginal damage at `m_opt`)
    pub price: f64,
}
