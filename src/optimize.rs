//! Bid optimizer: bisection over the feasibility predicate.
//!
//! Feasibility is assumed monotonic non-increasing in the bid (a higher
//! bid can only lower ROI). The search keeps the most recent feasible
//! midpoint as the answer; when no midpoint was ever feasible it
//! evaluates once at the left bound and returns that, marked infeasible.

use chrono::Utc;

use crate::config::Config;
use crate::error::{LotError, LotResult};
use crate::item::Item;
use crate::simulate::{feasible, CashConstraints, SimulationResult, DEFAULT_SEED, DEFAULT_SIMS};

/// Search bracket and budget for one optimization.
#[derive(Debug, Clone, Copy)]
pub struct OptimizerParams {
    pub lo: f64,
    pub hi: f64,
    /// Bracket width, in dollars, at which the search stops
    pub tol: f64,
    pub max_iter: u32,
    pub sims: usize,
    pub seed: u64,
}

impl OptimizerParams {
    pub fn new(lo: f64, hi: f64) -> Self {
        OptimizerParams {
            lo,
            hi,
            tol: 10.0,
            max_iter: 32,
            sims: DEFAULT_SIMS,
            seed: DEFAULT_SEED,
        }
    }
}

/// Find the largest bid in `[lo, hi]` meeting every constraint.
///
/// Returns the last feasible evaluation (with `iterations` and a UTC
/// timestamp recorded), or the evaluation at `lo` with
/// `meets_constraints=false` when nothing in the bracket is feasible.
pub fn optimize_bid(
    items: &[Item],
    config: &Config,
    params: &OptimizerParams,
    constraints: &CashConstraints,
) -> LotResult<SimulationResult> {
    if !params.lo.is_finite() || !params.hi.is_finite() {
        return Err(LotError::Config(format!(
            "bid bracket must be finite, got [{}, {}]",
            params.lo, params.hi
        )));
    }
    if params.lo > params.hi {
        return Err(LotError::Config(format!(
            "bid bracket is empty: lo {} > hi {}",
            params.lo, params.hi
        )));
    }
    if !params.tol.is_finite() || params.tol <= 0.0 {
        return Err(LotError::Config(format!(
            "tol must be positive, got {}",
            params.tol
        )));
    }
    config.validate()?;

    let mut left = params.lo;
    let mut right = params.hi;
    let mut best: Option<SimulationResult> = None;
    let mut iterations = 0u32;

    while right - left > params.tol && iterations < params.max_iter {
        let mid = (left + right) / 2.0;
        let (ok, mc) = feasible(items, mid, params.sims, params.seed, config, constraints);
        if ok {
            best = Some(mc);
            left = mid;
        } else {
            right = mid;
        }
        iterations += 1;
    }

    let mut result = match best {
        Some(r) => r,
        None => feasible(items, left, params.sims, params.seed, config, constraints).1,
    };
    result.iterations = iterations;
    result.timestamp = Some(Utc::now().to_rfc3339());
    Ok(result)
}
