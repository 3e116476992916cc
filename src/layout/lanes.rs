use std::collections::{BTreeMap, HashMap};

use log::{debug, trace, warn};

use crate::config::GatewayLanePolicy;
use crate::ir::Actor;

use super::graph::{Adjacency, NodeTable};

/// Participant id given to the synthesized lane of a document without actors.
pub const FALLBACK_LANE_ID: &str = "default_lane";
/// Header text of that lane.
pub const FALLBACK_LANE_LABEL: &str = "Participant";

#[derive(Debug, Clone, PartialEq)]
pub(super) struct LaneSpec {
    pub(super) participant_id: String,
    pub(super) label: String,
}

#[derive(Debug, Clone)]
pub(super) struct LaneAssignment {
    pub(super) lanes: Vec<LaneSpec>,
    pub(super) lane_of: Vec<usize>,
}

pub(super) fn assign_lanes(
    table: &NodeTable,
    adj: &Adjacency,
    actors: &[Actor],
    policy: GatewayLanePolicy,
) -> LaneAssignment {
    let mut lanes: Vec<LaneSpec> = Vec::with_capacity(actors.len());
    let mut lane_index: HashMap<&str, usize> = HashMap::new();
    for actor in actors {
        if lane_index.contains_key(actor.id.as_str()) {
            warn!("duplicate actor id '{}', keeping the first lane", actor.id);
            continue;
        }
        lane_index.insert(actor.id.as_str(), lanes.len());
        let label = if actor.name.trim().is_empty() {
            actor.id.clone()
        } else {
            actor.name.clone()
        };
        lanes.push(LaneSpec {
            participant_id: actor.id.clone(),
            label,
        });
    }
    if lanes.is_empty() && !table.is_empty() {
        debug!("document has no actors, placing every node in one fallback lane");
        lanes.push(LaneSpec {
            participant_id: FALLBACK_LANE_ID.to_string(),
            label: FALLBACK_LANE_LABEL.to_string(),
        });
    }

    let mut resolved: Vec<Option<usize>> = vec![None; table.len()];
    for (idx, node) in table.iter() {
        let Some(owner) = node.lane_owner.as_deref() else {
            continue;
        };
        let lane = match lane_index.get(owner) {
            Some(&lane) => lane,
            None => {
                if !lane_index.is_empty() {
                    warn!(
                        "task '{}' names unknown actor '{}', defaulting to lane 0",
                        node.id, owner
                    );
                }
                0
            }
        };
        resolved[idx] = Some(lane);
    }

    infer_gateway_lanes(&mut resolved, adj, policy);

    let lane_of = resolved
        .into_iter()
        .enumerate()
        .map(|(idx, lane)| {
            lane.unwrap_or_else(|| {
                trace!("node '{}' has no resolvable neighbor, using lane 0", table.get(idx).id);
                0
            })
        })
        .collect();

    LaneAssignment { lanes, lane_of }
}

/// Fills in lanes for nodes without an owner. Each pass walks unresolved nodes in
/// table order; passes repeat until nothing changes, so chains of gateways resolve
/// from whichever end reaches a task first.
fn infer_gateway_lanes(resolved: &mut [Option<usize>], adj: &Adjacency, policy: GatewayLanePolicy) {
    match policy {
        GatewayLanePolicy::FirstLane => {}
        GatewayLanePolicy::PredecessorFirst => {
            resolve_until_stable(resolved, |idx, lanes| {
                majority_lane(adj.predecessors(idx), lanes)
            });
            resolve_until_stable(resolved, |idx, lanes| {
                majority_lane(adj.predecessors(idx), lanes)
                    .or_else(|| first_lane(adj.successors(idx), lanes))
            });
        }
        GatewayLanePolicy::SuccessorFirst => {
            resolve_until_stable(resolved, |idx, lanes| first_lane(adj.successors(idx), lanes));
            resolve_until_stable(resolved, |idx, lanes| {
                first_lane(adj.successors(idx), lanes)
                    .or_else(|| majority_lane(adj.predecessors(idx), lanes))
            });
        }
    }
}

fn resolve_until_stable<F>(resolved: &mut [Option<usize>], rule: F)
where
    F: Fn(usize, &[Option<usize>]) -> Option<usize>,
{
    loop {
        let mut progress = false;
        for idx in 0..resolved.len() {
            if resolved[idx].is_some() {
                continue;
            }
            if let Some(lane) = rule(idx, resolved) {
                resolved[idx] = Some(lane);
                progress = true;
            }
        }
        if !progress {
            break;
        }
    }
}

/// Most common lane among resolved neighbors; ties go to the lower lane index.
fn majority_lane(neighbors: &[usize], lanes: &[Option<usize>]) -> Option<usize> {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for &neighbor in neighbors {
        if let Some(lane) = lanes[neighbor] {
            *counts.entry(lane).or_default() += 1;
        }
    }
    let mut best: Option<(usize, usize)> = None;
    for (lane, count) in counts {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((lane, count));
        }
    }
    best.map(|(lane, _)| lane)
}

fn first_lane(neighbors: &[usize], lanes: &[Option<usize>]) -> Option<usize> {
    neighbors.iter().find_map(|&neighbor| lanes[neighbor])
}
