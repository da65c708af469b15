//! Scalar root finding on a bracket, delegated to argmin's Brent solver.

use argmin::core::{CostFunction, Executor, State};
use argmin::solver::brent::BrentRoot;
use tracing::debug;

use crate::error::MacError;

const MAX_ITERS: u64 = 200;
/// Convergence tolerance relative to the bracket width
const RELATIVE_TOLERANCE: f64 = 1e-13;

struct Residual<F> {
    f: F,
}

impl<F> CostFunction for Residual<F>
where
    F: Fn(f64) -> f64,
{
    type Param = f64;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        Ok((self.f)(*x))
    }
}

/// Find `x` in `[lo, hi]` with `f(x) = 0`. `f(lo)` and `f(hi)` must differ in sign.
pub fn find_root<F>(f: F, lo: f64, hi: f64) -> Result<f64, MacError>
where
    F: Fn(f64) -> f64,
{
    let (f_lo, f_hi) = (f(lo), f(hi));
    if !f_lo.is_finite() || !f_hi.is_finite() {
        return Err(MacError::RootSolve(format!(
            "residual not finite on bracket [{lo}, {hi}]"
        )));
    }
    if f_lo == 0.0 {
        return Ok(lo);
    }
    if f_hi == 0.0 {
        return Ok(hi);
    }
    if f_lo.signum() == f_hi.signum() {
        return Err(MacError::RootSolve(format!(
            "bracket [{lo}, {hi}] does not enclose a root (f = {f_lo}, {f_hi})"
        )));
    }

    let solver = BrentRoot::new(lo, hi, RELATIVE_TOLERANCE * (hi - lo).abs());
    let result = Executor::new(Residual { f }, solver)
        .configure(|state| state.param(0.5 * (lo + hi)).max_iters(MAX_ITERS))
        .run()
        .map_err(|e| MacError::RootSolve(e.to_string()))?;

    let state = result.state();
    debug!(iterations = state.get_iter(), "brent root solve finished");
    state
        .get_best_param()
        .or_else(|| state.get_param())
        .copied()
        .ok_or_else(|| MacError::RootSolve("solver returned no parameter".to_string()))
}
