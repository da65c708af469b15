//! Technology-disaggregated MAC model.
//!
//! Each technology `i` can remove a share `θi` of emissions. Adoption costs
//! per unit of emissions are normally distributed with mean `ci` and spread
//! `σi` across adopters, so at emission price `τ` a share `Φ((τ − ci)/σi)`
//! adopts. Firms pay the lower of the price and their abatement cost on every
//! unit of emissions, which raises the effective energy price and lowers
//! energy use.

use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};
use std::collections::HashSet;
use tracing::debug;

use super::{root, Curve, MacModel, MacParams};
use crate::error::MacError;

const SHARE_TOLERANCE: f64 = 1e-9;
const MAX_BRACKET_DOUBLINGS: usize = 64;

/// One abatement technology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technology {
    pub id: String,
    /// Share of emissions the technology can remove
    pub theta: f64,
    /// Mean abatement cost per unit of emissions
    pub cost: f64,
    /// Dispersion of abatement costs across adopters
    pub sigma: f64,
}

/// The ways a technology table can be supplied.
#[derive(Debug, Clone, PartialEq)]
pub enum TechInput {
    /// A single inactive technology `T1` (θ = 0, c = 1, σ = 1).
    Default,
    /// Technologies with their own identifiers, in the given order.
    Named(Vec<Technology>),
    /// Parallel value vectors; identifiers are generated as `T1..Tn`.
    Values {
        theta: Vec<f64>,
        cost: Vec<f64>,
        sigma: Vec<f64>,
    },
}

#[derive(Debug, Clone)]
pub struct MacTech {
    base: MacModel,
    techs: Vec<Technology>,
    normal: Normal,
}

impl MacTech {
    pub fn new(params: MacParams, input: TechInput) -> Result<Self, MacError> {
        let normal = Normal::new(0.0, 1.0).map_err(|e| MacError::Technology(e.to_string()))?;
        let mut model = Self {
            base: MacModel::new(params)?,
            techs: Vec::new(),
            normal,
        };
        model.init_techs(input)?;
        Ok(model)
    }

    /// Replace the technology table.
    pub fn init_techs(&mut self, input: TechInput) -> Result<(), MacError> {
        let techs = match input {
            TechInput::Default => vec![Technology {
                id: "T1".to_string(),
                theta: 0.0,
                cost: 1.0,
                sigma: 1.0,
            }],
            TechInput::Named(techs) => techs,
            TechInput::Values { theta, cost, sigma } => {
                if theta.len() != cost.len() || theta.len() != sigma.len() {
                    return Err(MacError::Technology(format!(
                        "theta, cost and sigma lengths differ ({}, {}, {})",
                        theta.len(),
                        cost.len(),
                        sigma.len()
                    )));
                }
                theta
                    .into_iter()
                    .zip(cost)
                    .zip(sigma)
                    .enumerate()
                    .map(|(i, ((theta, cost), sigma))| Technology {
                        id: format!("T{}", i + 1),
                        theta,
                        cost,
                        sigma,
                    })
                    .collect()
            }
        };
        check_techs(&techs)?;
        // Compliance cost rises with the price, so zero is the worst case
        let p = self.base.params();
        let floor = p.pe + compliance_cost(&techs, &self.normal, p.phi, 0.0);
        if floor <= 0.0 {
            return Err(MacError::Technology(format!(
                "abatement credit at zero emission price drives the energy price to {floor}"
            )));
        }
        debug!(count = techs.len(), "initialised technology table");
        self.techs = techs;
        Ok(())
    }

    pub fn base(&self) -> &MacModel {
        &self.base
    }

    pub fn techs(&self) -> &[Technology] {
        &self.techs
    }

    pub fn ids(&self) -> Vec<&str> {
        self.techs.iter().map(|t| t.id.as_str()).collect()
    }

    fn z(&self, tech: &Technology, tau: f64) -> f64 {
        (tau - tech.cost) / tech.sigma
    }

    /// Adoption share of every technology at emission price `tau`.
    pub fn uptake(&self, tau: f64) -> Vec<f64> {
        self.techs
            .iter()
            .map(|t| self.normal.cdf(self.z(t, tau)))
            .collect()
    }

    /// Emissions per unit of energy after adoption.
    pub fn intensity(&self, tau: f64) -> f64 {
        let abated: f64 = self
            .techs
            .iter()
            .zip(self.uptake(tau))
            .map(|(t, s)| t.theta * s)
            .sum();
        self.base.params().phi * (1.0 - abated)
    }

    /// Expected compliance cost per unit of energy at emission price `tau`.
    pub fn effective_price(&self, tau: f64) -> f64 {
        compliance_cost(&self.techs, &self.normal, self.base.params().phi, tau)
    }

    /// Energy use chosen by firms facing emission price `tau`.
    pub fn energy(&self, tau: f64) -> f64 {
        let p = self.base.params();
        let marginal = p.pe + self.effective_price(tau);
        if marginal <= 0.0 {
            return f64::INFINITY;
        }
        (p.alpha * p.gamma / marginal).powf(1.0 / (1.0 - p.alpha))
    }

    pub fn emissions_at(&self, tau: f64) -> f64 {
        self.intensity(tau) * self.energy(tau)
    }

    /// Abatement relative to unregulated emissions `ϕ·E0`.
    pub fn abatement(&self, tau: f64) -> f64 {
        self.base.m0(self.base.e0()) - self.emissions_at(tau)
    }

    /// MAC curve traced out by a set of emission prices: (abatement, price).
    pub fn mac_curve(&self, prices: &[f64]) -> Result<Curve, MacError> {
        if let Some(bad) = prices.iter().find(|p| !p.is_finite() || **p < 0.0) {
            return Err(MacError::InvalidGrid(format!(
                "emission prices must be non-negative and finite, got {bad}"
            )));
        }
        let mut curve = Curve::new("MAC", "A");
        for &tau in prices {
            curve.push(self.abatement(tau), tau);
        }
        Ok(curve)
    }

    /// Pigouvian emission price: `τ = γd · M(τ)`.
    pub fn optimal_price(&self) -> Result<f64, MacError> {
        let gamma_d = self.base.params().gamma_d;
        if gamma_d == 0.0 {
            return Ok(0.0);
        }
        let residual = |tau: f64| tau - gamma_d * self.emissions_at(tau);

        let mut hi = gamma_d * self.base.m0(self.base.e0());
        let mut doublings = 0;
        while residual(hi) < 0.0 {
            if doublings == MAX_BRACKET_DOUBLINGS {
                return Err(MacError::RootSolve(
                    "could not bracket the optimal emission price".to_string(),
                ));
            }
            hi = 2.0 * hi.max(1.0);
            doublings += 1;
        }
        let tau = root::find_root(residual, 0.0, hi)?;
        debug!(tau, "solved optimal emission price");
        Ok(tau)
    }

    /// Outcome at the optimal emission price.
    pub fn outcome(&self) -> Result<TechOutcome, MacError> {
        let price = self.optimal_price()?;
        let uptake = self
            .techs
            .iter()
            .zip(self.uptake(price))
            .map(|(t, s)| (t.id.clone(), s))
            .collect();
        Ok(TechOutcome {
            price,
            energy: self.energy(price),
            emissions: self.emissions_at(price),
            abatement: self.abatement(price),
            uptake,
        })
    }
}

/// Optimal policy outcome with technology adoption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechOutcome {
    pub price: f64,
    pub energy: f64,
    pub emissions: f64,
    pub abatement: f64,
    pub uptake: Vec<(String, f64)>,
}

/// `ϕ[(1 − Σθ)τ + Σθ·E[min(C, τ)]]` with `C ~ N(c, σ)` per technology.
fn compliance_cost(techs: &[Technology], normal: &Normal, phi: f64, tau: f64) -> f64 {
    let covered: f64 = techs.iter().map(|t| t.theta).sum();
    let with_tech: f64 = techs
        .iter()
        .map(|t| {
            let z = (tau - t.cost) / t.sigma;
            let share = normal.cdf(z);
            t.theta * (t.cost * share - t.sigma * normal.pdf(z) + tau * (1.0 - share))
        })
        .sum();
    phi * ((1.0 - covered) * tau + with_tech)
}

fn check_techs(techs: &[Technology]) -> Result<(), MacError> {
    if techs.is_empty() {
        return Err(MacError::Technology("technology table is empty".to_string()));
    }
    let mut seen = HashSet::new();
    for t in techs {
        if t.id.is_empty() {
            return Err(MacError::Technology("technology id is empty".to_string()));
        }
        if !seen.insert(t.id.as_str()) {
            return Err(MacError::Technology(format!("duplicate technology id '{}'", t.id)));
        }
        if !(0.0..=1.0).contains(&t.theta) {
            return Err(MacError::Technology(format!(
                "{}: theta must be within [0, 1], got {}",
                t.id, t.theta
            )));
        }
        if !t.cost.is_finite() {
            return Err(MacError::Technology(format!("{}: cost is not finite", t.id)));
        }
        if !(t.sigma.is_finite() && t.sigma > 0.0) {
            return Err(MacError::Technology(format!(
                "{}: sigma must be positive, got {}",
                t.id, t.sigma
            )));
        }
    }
    let total: f64 = techs.iter().map(|t| t.theta).sum();
    if total > 1.0 + SHARE_TOLERANCE {
        return Err(MacError::Technology(format!(
            "technology shares sum to {total}, more than all emissions"
        )));
    }
    Ok(())
}
