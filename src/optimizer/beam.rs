//! Bounded state-space search across periods.
//!
//! Each layer keeps at most `beam_width` fleet states, one per distinct state
//! signature, ranked by cumulative cost. Every retained state is expanded by all
//! commitment combinations its units' statuses allow, each combination is priced
//! through economic allocation, and the cheapest final state is backtracked
//! through its predecessor links.

use std::collections::HashMap;

use ordered_float::OrderedFloat;
use tracing::{debug, warn};

use super::constraints::{resolve_all, UnitStatus};
use super::cost::{merit_order, transition_cost};
use super::dispatch::{
    evaluate_commitment, fallback_dispatch, feasible_patterns, infeasible_reason, Dispatch,
    DispatchUnit,
};
use super::state::{advance_all, initial_states, Commitment, UnitState};
use super::types::{CommitmentPlan, CommitmentStrategy, PeriodPlan};
use crate::config::OptimizerConfig;
use crate::domain::{DemandProfile, FailureReason, GeneratingUnit};
use crate::error::Result;

const COST_EPSILON: f64 = 1e-9;

type Signature = Vec<(bool, u32, u32)>;

struct Node {
    states: Vec<UnitState>,
    cost: f64,
    /// Index into the previous layer.
    parent: usize,
    commitments: Vec<Commitment>,
    failure: Option<FailureReason>,
}

pub struct BeamSearchScheduler {
    config: OptimizerConfig,
}

impl BeamSearchScheduler {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// On/off patterns for one state that can cover `demand_mw`, enumerated in merit order.
    fn combinations(
        &self,
        order: &[usize],
        statuses: &[UnitStatus],
        demand_mw: f64,
        tolerance: f64,
    ) -> (Vec<Vec<bool>>, bool) {
        let limit = self.config.max_expansions_per_state;
        feasible_patterns(order, statuses, demand_mw, tolerance, limit)
    }

    fn expand(
        &self,
        units: &[GeneratingUnit],
        order: &[usize],
        node: &Node,
        parent: usize,
        demand_mw: f64,
        layer: &mut Layer,
    ) -> usize {
        let tolerance = self.config.tolerance_for(demand_mw);
        let statuses = resolve_all(units, &node.states);
        let inputs = dispatch_inputs(units, &node.states, &statuses);

        let (patterns, truncated) = self.combinations(order, &statuses, demand_mw, tolerance);
        if truncated {
            warn!(
                limit = self.config.max_expansions_per_state,
                "commitment enumeration truncated for one state"
            );
        }

        let mut expanded = 0;
        for on in &patterns {
            let Some(dispatch) = evaluate_commitment(&inputs, on, demand_mw, tolerance) else {
                continue;
            };
            expanded += 1;
            let cost = node.cost + dispatch.cost + shutdown_cost(units, &node.states, &dispatch);
            let states = advance_all(&node.states, &dispatch.commitments);
            layer.offer(
                units,
                Node {
                    states,
                    cost,
                    parent,
                    commitments: dispatch.commitments,
                    failure: None,
                },
            );
        }
        expanded
    }

    /// Best-effort layer for a period no retained state can serve.
    fn fallback(
        &self,
        units: &[GeneratingUnit],
        period: usize,
        node: &Node,
        demand_mw: f64,
    ) -> Node {
        let statuses = resolve_all(units, &node.states);
        let inputs = dispatch_inputs(units, &node.states, &statuses);
        let reason = infeasible_reason(period, &inputs, demand_mw);
        warn!(
            period,
            %reason,
            "no retained state can serve period, committing all available units"
        );

        let dispatch = fallback_dispatch(&inputs, demand_mw);
        Node {
            states: advance_all(&node.states, &dispatch.commitments),
            cost: node.cost + dispatch.cost + shutdown_cost(units, &node.states, &dispatch),
            parent: 0,
            commitments: dispatch.commitments,
            failure: Some(reason),
        }
    }
}

impl CommitmentStrategy for BeamSearchScheduler {
    fn name(&self) -> &'static str {
        "beam_search"
    }

    fn schedule(&self, units: &[GeneratingUnit], demand: &DemandProfile) -> Result<CommitmentPlan> {
        let order = merit_order(units);
        let root = Node {
            states: initial_states(units),
            cost: 0.0,
            parent: 0,
            commitments: Vec::new(),
            failure: None,
        };
        let mut layers: Vec<Vec<Node>> = vec![vec![root]];

        for (period, &demand_mw) in demand.values().iter().enumerate() {
            let previous = &layers[period];
            let mut layer = Layer::default();
            let mut expansions = 0;
            for (parent, node) in previous.iter().enumerate() {
                expansions += self.expand(units, &order, node, parent, demand_mw, &mut layer);
            }

            let mut nodes = layer.into_ranked(self.config.beam_width);
            if nodes.is_empty() {
                // previous layer is ranked, so index 0 is its cheapest state
                nodes.push(self.fallback(units, period, &previous[0], demand_mw));
            }
            debug!(
                period,
                demand_mw,
                parents = previous.len(),
                expansions,
                retained = nodes.len(),
                best_cost = nodes[0].cost,
                "beam layer"
            );
            layers.push(nodes);
        }

        Ok(backtrack(layers))
    }
}

/// Candidate nodes of one layer, deduplicated by state signature.
#[derive(Default)]
struct Layer {
    nodes: Vec<Node>,
    index: HashMap<Signature, usize>,
}

impl Layer {
    fn offer(&mut self, units: &[GeneratingUnit], node: Node) {
        let signature: Signature = units
            .iter()
            .zip(&node.states)
            .map(|(unit, state)| state.signature(unit))
            .collect();
        match self.index.get(&signature) {
            Some(&slot) => {
                if node.cost < self.nodes[slot].cost - COST_EPSILON {
                    self.nodes[slot] = node;
                }
            }
            None => {
                self.index.insert(signature, self.nodes.len());
                self.nodes.push(node);
            }
        }
    }

    /// Cheapest `width` nodes. Equal costs prefer fewer committed units, then
    /// insertion order.
    fn into_ranked(self, width: usize) -> Vec<Node> {
        let mut nodes = self.nodes;
        nodes.sort_by_key(|n| {
            let committed = n.commitments.iter().filter(|c| c.is_on()).count();
            (OrderedFloat(n.cost), committed)
        });
        nodes.truncate(width);
        nodes
    }
}

fn dispatch_inputs<'u>(
    units: &'u [GeneratingUnit],
    states: &[UnitState],
    statuses: &[UnitStatus],
) -> Vec<DispatchUnit<'u>> {
    units
        .iter()
        .zip(states)
        .zip(statuses)
        .map(|((unit, state), &status)| DispatchUnit {
            unit,
            status,
            was_on: state.is_on,
        })
        .collect()
}

fn shutdown_cost(units: &[GeneratingUnit], states: &[UnitState], dispatch: &Dispatch) -> f64 {
    units
        .iter()
        .zip(states)
        .zip(&dispatch.commitments)
        .filter(|((_, state), decision)| state.is_on && !decision.is_on())
        .map(|((unit, _), _)| transition_cost(unit, true, false))
        .sum()
}

/// Follow parent links from the cheapest final node back to the first period.
fn backtrack(mut layers: Vec<Vec<Node>>) -> CommitmentPlan {
    let mut periods = Vec::with_capacity(layers.len().saturating_sub(1));
    let mut slot = 0;
    while layers.len() > 1 {
        let Some(mut layer) = layers.pop() else {
            break;
        };
        let node = layer.swap_remove(slot);
        slot = node.parent;
        periods.push(PeriodPlan {
            commitments: node.commitments,
            failure: node.failure,
        });
    }
    periods.reverse();
    CommitmentPlan { periods }
}
