//! Single-period economic dispatch.
//!
//! Free units are branched over (off, or on at a discretized set of power levels)
//! with memoization on `(free unit index, rounded residual demand)`. Grid levels are
//! placed so the residual left for the next unit lands on a multiple of the power
//! step, so each unit sees at most one memo entry per step of remaining capacity
//! plus a handful of exact closing values. Locked-on units absorb whatever residual
//! remains through an exact equal-incremental-cost allocation inside their bands.
//! The memo table lives for one call only.
//!
//! When no grid path balances the period, every feasible on/off pattern (up to
//! `max_expansions_per_state`) is priced by exact allocation instead.

use std::collections::HashMap;

use ordered_float::OrderedFloat;
use tracing::{debug, warn};

use super::constraints::{achievable_range, PowerBand, UnitStatus};
use super::cost::{merit_order_key, running_cost};
use super::state::Commitment;
use crate::config::OptimizerConfig;
use crate::domain::{FailureReason, GeneratingUnit};

const LAMBDA_ITERATIONS: usize = 100;
const COST_EPSILON: f64 = 1e-9;

/// A unit as seen by the dispatcher for one period.
#[derive(Debug, Clone, Copy)]
pub struct DispatchUnit<'a> {
    pub unit: &'a GeneratingUnit,
    pub status: UnitStatus,
    /// Whether the unit ran in the previous period (drives startup cost).
    pub was_on: bool,
}

/// A feasible allocation for one period.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    /// One entry per input unit, in input order.
    pub commitments: Vec<Commitment>,
    /// Production plus startup cost. Shutdown cost is attributed by the scheduler.
    pub cost: f64,
    pub generation_mw: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Dispatched(Dispatch),
    Infeasible(FailureReason),
}

pub struct SinglePeriodDispatcher<'c> {
    config: &'c OptimizerConfig,
}

impl<'c> SinglePeriodDispatcher<'c> {
    pub fn new(config: &'c OptimizerConfig) -> Self {
        Self { config }
    }

    /// Minimum-cost allocation of `demand_mw` over `units`.
    pub fn dispatch(
        &self,
        period: usize,
        units: &[DispatchUnit<'_>],
        demand_mw: f64,
    ) -> DispatchOutcome {
        let tolerance = self.config.tolerance_for(demand_mw);
        let mut search = Search::new(units, self.config, tolerance);

        let best = search.solve(0, demand_mw);
        let memo_entries = search.memo.len();
        let gridded = best.and_then(|_| search.reconstruct(demand_mw));
        let on_grid = gridded.is_some();
        let dispatch = gridded.or_else(|| self.enumerate(units, demand_mw, tolerance));
        debug!(
            period,
            demand_mw,
            free_units = search.free.len(),
            locked_on = search.locked.len(),
            memo_entries,
            on_grid,
            feasible = dispatch.is_some(),
            "single-period dispatch"
        );

        match dispatch {
            Some(dispatch) => DispatchOutcome::Dispatched(dispatch),
            None => DispatchOutcome::Infeasible(infeasible_reason(period, units, demand_mw)),
        }
    }

    /// Cheapest exact allocation over all feasible on/off patterns, in merit order.
    fn enumerate(
        &self,
        units: &[DispatchUnit<'_>],
        demand_mw: f64,
        tolerance: f64,
    ) -> Option<Dispatch> {
        let mut order: Vec<usize> = (0..units.len()).collect();
        order.sort_by_key(|&i| (OrderedFloat(merit_order_key(units[i].unit)), i));
        let statuses: Vec<UnitStatus> = units.iter().map(|u| u.status).collect();

        let limit = self.config.max_expansions_per_state;
        let (patterns, truncated) =
            feasible_patterns(&order, &statuses, demand_mw, tolerance, limit);
        if truncated {
            warn!(limit, demand_mw, "pattern enumeration truncated for single-period dispatch");
        }

        let mut best: Option<Dispatch> = None;
        for on in &patterns {
            let Some(candidate) = evaluate_commitment(units, on, demand_mw, tolerance) else {
                continue;
            };
            if best.as_ref().map_or(true, |b| candidate.cost < b.cost - COST_EPSILON) {
                best = Some(candidate);
            }
        }
        best
    }
}

pub(crate) fn infeasible_reason(
    period: usize,
    units: &[DispatchUnit<'_>],
    demand_mw: f64,
) -> FailureReason {
    let statuses: Vec<UnitStatus> = units.iter().map(|u| u.status).collect();
    let (achievable_min_mw, achievable_max_mw) = achievable_range(&statuses);
    FailureReason::InfeasiblePeriod {
        period,
        required_mw: demand_mw,
        achievable_min_mw,
        achievable_max_mw,
    }
}

#[derive(Debug, Clone, Copy)]
struct Branch {
    cost: f64,
    /// Power of the free unit at this level; `None` when it stays off or at the leaf.
    choice: Option<f64>,
}

struct Search<'s, 'u> {
    units: &'s [DispatchUnit<'u>],
    free: Vec<usize>,
    locked: Vec<usize>,
    locked_min: f64,
    locked_max: f64,
    /// `suffix_max[k]`: most that free units `k..` plus locked units can produce.
    suffix_max: Vec<f64>,
    tolerance: f64,
    step: f64,
    resolution: f64,
    memo: HashMap<(usize, i64), Option<Branch>>,
}

impl<'s, 'u> Search<'s, 'u> {
    fn new(units: &'s [DispatchUnit<'u>], config: &OptimizerConfig, tolerance: f64) -> Self {
        let mut free = Vec::new();
        let mut locked = Vec::new();
        for (i, u) in units.iter().enumerate() {
            match u.status {
                UnitStatus::Free(_) => free.push(i),
                UnitStatus::LockedOn(_) => locked.push(i),
                UnitStatus::LockedOff => {}
            }
        }

        let locked_bands = locked.iter().filter_map(|&i| units[i].status.on_band());
        let (locked_min, locked_max) =
            locked_bands.fold((0.0, 0.0), |(lo, hi), b| (lo + b.min_mw, hi + b.max_mw));

        let mut suffix_max = vec![locked_max; free.len() + 1];
        for k in (0..free.len()).rev() {
            suffix_max[k] = suffix_max[k + 1] + units[free[k]].status.possible_max_mw();
        }

        Self {
            units,
            free,
            locked,
            locked_min,
            locked_max,
            suffix_max,
            tolerance,
            step: config.power_step_mw,
            resolution: config.memo_resolution_mw,
            memo: HashMap::new(),
        }
    }

    fn key(&self, k: usize, residual: f64) -> (usize, i64) {
        (k, (residual / self.resolution).round() as i64)
    }

    /// Cheapest cost to serve `residual` with free units `k..` and the locked units.
    fn solve(&mut self, k: usize, residual: f64) -> Option<f64> {
        let key = self.key(k, residual);
        if let Some(entry) = self.memo.get(&key) {
            return entry.map(|b| b.cost);
        }

        let result = if k == self.free.len() {
            self.leaf(residual).map(|(cost, _)| Branch { cost, choice: None })
        } else if residual > self.suffix_max[k] + self.tolerance
            || residual < self.locked_min - self.tolerance
        {
            None
        } else {
            self.branch(k, residual)
        };

        self.memo.insert(key, result);
        result.map(|b| b.cost)
    }

    fn branch(&mut self, k: usize, residual: f64) -> Option<Branch> {
        let du = self.units[self.free[k]];
        let mut best = self.solve(k + 1, residual).map(|cost| Branch { cost, choice: None });

        let Some(band) = du.status.on_band() else {
            return best;
        };
        let startup = if du.was_on { 0.0 } else { du.unit.startup_cost };

        for power in self.candidates(k, band, residual) {
            let rest = residual - power;
            if rest < self.locked_min - self.tolerance {
                break;
            }
            if rest > self.suffix_max[k + 1] + self.tolerance {
                continue;
            }
            let Some(rest_cost) = self.solve(k + 1, rest) else {
                continue;
            };
            let total = rest_cost + running_cost(du.unit, power) + startup;
            if best.map_or(true, |b| total < b.cost - COST_EPSILON) {
                best = Some(Branch {
                    cost: total,
                    choice: Some(power),
                });
            }
        }

        best
    }

    /// Ascending candidate power levels for free unit `k`.
    ///
    /// Grid levels leave a residual that is a whole number of steps. Bands narrower
    /// than one step may hold no such level and offer their endpoints instead. The
    /// exact values that close the residual are always added.
    fn candidates(&self, k: usize, band: PowerBand, residual: f64) -> Vec<f64> {
        let mut out = Vec::new();
        if band.width() < self.step {
            out.extend([band.min_mw, band.max_mw]);
        } else {
            let fewest_steps = ((residual - band.max_mw) / self.step).ceil().max(0.0);
            let most_steps = ((residual - band.min_mw) / self.step).floor();
            if most_steps >= fewest_steps {
                let count = (most_steps - fewest_steps) as usize;
                for m in 0..=count {
                    let rest = (fewest_steps + m as f64) * self.step;
                    out.push(band.clamp(residual - rest));
                }
            }
        }

        for exact in [
            residual,
            residual - self.locked_min,
            residual - self.suffix_max[k + 1],
        ] {
            if band.contains(exact) {
                out.push(band.clamp(exact));
            }
        }

        out.sort_by_key(|p| OrderedFloat(*p));
        out.dedup_by(|a, b| (*a - *b).abs() < self.resolution);
        out
    }

    /// Serve `residual` with the locked-on units alone.
    fn leaf(&self, residual: f64) -> Option<(f64, Vec<f64>)> {
        if self.locked.is_empty() {
            return (residual.abs() <= self.tolerance).then(|| (0.0, Vec::new()));
        }
        if residual < self.locked_min - self.tolerance
            || residual > self.locked_max + self.tolerance
        {
            return None;
        }

        let committed: Vec<(&GeneratingUnit, PowerBand)> = self
            .locked
            .iter()
            .filter_map(|&i| self.units[i].status.on_band().map(|b| (self.units[i].unit, b)))
            .collect();
        let powers = allocate(&committed, residual);
        let cost: f64 = committed
            .iter()
            .zip(&powers)
            .zip(&self.locked)
            .map(|(((unit, _), &p), &i)| {
                let startup = if self.units[i].was_on { 0.0 } else { unit.startup_cost };
                running_cost(unit, p) + startup
            })
            .sum();
        Some((cost, powers))
    }

    /// Replay memoized choices from the root to rebuild the optimal assignment.
    fn reconstruct(&self, demand_mw: f64) -> Option<Dispatch> {
        let mut commitments = vec![Commitment::Off; self.units.len()];
        let mut residual = demand_mw;
        let mut cost = 0.0;

        for (k, &i) in self.free.iter().enumerate() {
            let branch = self.memo.get(&self.key(k, residual)).copied().flatten()?;
            if let Some(power_mw) = branch.choice {
                let du = &self.units[i];
                commitments[i] = Commitment::On { power_mw };
                let startup = if du.was_on { 0.0 } else { du.unit.startup_cost };
                cost += running_cost(du.unit, power_mw) + startup;
                residual -= power_mw;
            }
        }

        let (leaf_cost, powers) = self.leaf(residual)?;
        cost += leaf_cost;
        for (&i, &power_mw) in self.locked.iter().zip(&powers) {
            commitments[i] = Commitment::On { power_mw };
        }

        let generation_mw = commitments.iter().map(Commitment::power_mw).sum();
        Some(Dispatch {
            commitments,
            cost,
            generation_mw,
        })
    }
}

/// Evaluate one fixed on/off pattern: allocate demand over the committed units.
///
/// Returns `None` when the committed bands cannot meet demand within `tolerance`.
pub fn evaluate_commitment(
    units: &[DispatchUnit<'_>],
    on: &[bool],
    demand_mw: f64,
    tolerance: f64,
) -> Option<Dispatch> {
    let committed: Vec<(usize, &GeneratingUnit, PowerBand)> = units
        .iter()
        .zip(on)
        .enumerate()
        .filter(|(_, (_, is_on))| **is_on)
        .map(|(i, (du, _))| du.status.on_band().map(|b| (i, du.unit, b)))
        .collect::<Option<_>>()?;

    let (lo, hi) = committed
        .iter()
        .fold((0.0, 0.0), |(lo, hi), (_, _, b)| (lo + b.min_mw, hi + b.max_mw));
    if demand_mw < lo - tolerance || demand_mw > hi + tolerance {
        return None;
    }

    let bands: Vec<(&GeneratingUnit, PowerBand)> =
        committed.iter().map(|(_, u, b)| (*u, *b)).collect();
    let powers = allocate(&bands, demand_mw);

    let mut commitments = vec![Commitment::Off; units.len()];
    let mut cost = 0.0;
    for ((i, unit, _), power_mw) in committed.iter().zip(powers) {
        commitments[*i] = Commitment::On { power_mw };
        let startup = if units[*i].was_on { 0.0 } else { unit.startup_cost };
        cost += running_cost(unit, power_mw) + startup;
    }
    let generation_mw = commitments.iter().map(Commitment::power_mw).sum();

    Some(Dispatch {
        commitments,
        cost,
        generation_mw,
    })
}

/// On/off patterns whose combined band can cover `demand_mw`, enumerated over
/// `order` with "on" tried first. Stops after `limit` patterns; the flag reports
/// whether that cut anything off.
pub(crate) fn feasible_patterns(
    order: &[usize],
    statuses: &[UnitStatus],
    demand_mw: f64,
    tolerance: f64,
    limit: usize,
) -> (Vec<Vec<bool>>, bool) {
    // rest_min[k] / rest_max[k]: output still forced / possible from order[k..]
    let mut rest_min = vec![0.0; order.len() + 1];
    let mut rest_max = vec![0.0; order.len() + 1];
    for k in (0..order.len()).rev() {
        let status = &statuses[order[k]];
        rest_min[k] = rest_min[k + 1] + status.forced_min_mw();
        rest_max[k] = rest_max[k + 1] + status.possible_max_mw();
    }

    let mut enumeration = Enumeration {
        order,
        statuses,
        rest_min: &rest_min,
        rest_max: &rest_max,
        demand_mw,
        tolerance,
        limit,
        current: vec![false; statuses.len()],
        found: Vec::new(),
        truncated: false,
    };
    enumeration.visit(0, 0.0, 0.0);
    (enumeration.found, enumeration.truncated)
}

struct Enumeration<'a> {
    order: &'a [usize],
    statuses: &'a [UnitStatus],
    rest_min: &'a [f64],
    rest_max: &'a [f64],
    demand_mw: f64,
    tolerance: f64,
    limit: usize,
    current: Vec<bool>,
    found: Vec<Vec<bool>>,
    truncated: bool,
}

impl Enumeration<'_> {
    fn visit(&mut self, k: usize, committed_min: f64, committed_max: f64) {
        if self.found.len() >= self.limit {
            self.truncated = true;
            return;
        }
        if committed_min + self.rest_min[k] > self.demand_mw + self.tolerance
            || committed_max + self.rest_max[k] < self.demand_mw - self.tolerance
        {
            return;
        }
        if k == self.order.len() {
            self.found.push(self.current.clone());
            return;
        }

        let i = self.order[k];
        let status = self.statuses[i];
        if let Some(band) = status.on_band() {
            self.current[i] = true;
            self.visit(k + 1, committed_min + band.min_mw, committed_max + band.max_mw);
            self.current[i] = false;
        }
        if status.can_be_off() {
            self.visit(k + 1, committed_min, committed_max);
        }
    }
}

/// Best-effort output for an infeasible period: every unit that may run is
/// committed and output is pushed as close to demand as the bands allow.
pub fn fallback_dispatch(units: &[DispatchUnit<'_>], demand_mw: f64) -> Dispatch {
    let on: Vec<bool> = units.iter().map(|u| u.status.can_be_on()).collect();
    let (lo, hi) = units
        .iter()
        .filter_map(|u| u.status.on_band())
        .fold((0.0, 0.0), |(lo, hi), b| (lo + b.min_mw, hi + b.max_mw));
    let target = demand_mw.max(lo).min(hi);
    evaluate_commitment(units, &on, target, f64::INFINITY).unwrap_or_else(|| Dispatch {
        commitments: vec![Commitment::Off; units.len()],
        cost: 0.0,
        generation_mw: 0.0,
    })
}

/// Equal-incremental-cost allocation of `target_mw` over committed units.
///
/// The target is clamped into the combined band. Quadratic units follow the
/// lambda response curve; units with flat marginal cost take the remaining gap in
/// merit order once lambda has converged.
pub fn allocate(committed: &[(&GeneratingUnit, PowerBand)], target_mw: f64) -> Vec<f64> {
    let total_min: f64 = committed.iter().map(|(_, b)| b.min_mw).sum();
    let total_max: f64 = committed.iter().map(|(_, b)| b.max_mw).sum();
    let target = target_mw.max(total_min).min(total_max);

    if target <= total_min {
        return committed.iter().map(|(_, b)| b.min_mw).collect();
    }
    if target >= total_max {
        return committed.iter().map(|(_, b)| b.max_mw).collect();
    }

    let total_at = |lambda: f64| -> f64 {
        committed
            .iter()
            .map(|(u, b)| response(u, *b, lambda))
            .sum()
    };

    let mut lo = committed
        .iter()
        .map(|(u, b)| u.cost.marginal_cost(b.min_mw))
        .fold(f64::INFINITY, f64::min)
        - 1.0;
    let mut hi = committed
        .iter()
        .map(|(u, b)| u.cost.marginal_cost(b.max_mw))
        .fold(f64::NEG_INFINITY, f64::max)
        + 1.0;
    for _ in 0..LAMBDA_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if total_at(mid) < target {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    let mut powers: Vec<f64> = committed.iter().map(|(u, b)| response(u, *b, lo)).collect();
    let upper: Vec<f64> = committed.iter().map(|(u, b)| response(u, *b, hi)).collect();

    let mut deficit = target - powers.iter().sum::<f64>();
    let mut order: Vec<usize> = (0..committed.len()).collect();
    order.sort_by_key(|&i| (OrderedFloat(committed[i].0.cost.marginal_cost(powers[i])), i));
    for &i in &order {
        if deficit <= 0.0 {
            break;
        }
        let step = (upper[i] - powers[i]).max(0.0).min(deficit);
        powers[i] += step;
        deficit -= step;
    }
    // rounding leftovers go to whoever still has headroom
    for &i in &order {
        if deficit <= 0.0 {
            break;
        }
        let step = (committed[i].1.max_mw - powers[i]).max(0.0).min(deficit);
        powers[i] += step;
        deficit -= step;
    }

    powers
}

/// Output of one unit at system marginal cost `lambda`.
fn response(unit: &GeneratingUnit, band: PowerBand, lambda: f64) -> f64 {
    let c = &unit.cost;
    let p = if c.quadratic > 0.0 {
        (lambda - c.linear) / (2.0 * c.quadratic)
    } else if lambda >= c.linear {
        band.max_mw
    } else {
        band.min_mw
    };
    band.clamp(p)
}
